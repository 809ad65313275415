use serde::{Deserialize, Serialize};

/// Configuration for the [`DataStore`](crate::DataStore).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Namespace token prepended to every cache key the store owns.
    pub cache_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_prefix: "DS:".into(),
        }
    }
}

impl StoreConfig {
    /// Cache key of the serialized map.
    pub fn snapshot_key(&self) -> String {
        format!("{}DS", self.cache_prefix)
    }

    /// Cache key of the change counter.
    pub fn change_id_key(&self) -> String {
        format!("{}maxChangeId", self.cache_prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keys() {
        let c = StoreConfig::default();
        assert_eq!(c.snapshot_key(), "DS:DS");
        assert_eq!(c.change_id_key(), "DS:maxChangeId");
    }

    #[test]
    fn custom_prefix() {
        let c = StoreConfig {
            cache_prefix: "tenant-a/".into(),
        };
        assert_eq!(c.snapshot_key(), "tenant-a/DS");
        assert_eq!(c.change_id_key(), "tenant-a/maxChangeId");
    }

    #[test]
    fn missing_fields_use_defaults() {
        let c: StoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(c, StoreConfig::default());
    }
}
