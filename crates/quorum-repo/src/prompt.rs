use async_trait::async_trait;

/// Confirmation dialog shown before destructive operations.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Ask the user; `false` means declined or dismissed.
    async fn confirm(&self, title: &str, content: &str) -> bool;
}

/// Prompt that always agrees. For scripted use.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysConfirm;

#[async_trait]
impl Prompt for AlwaysConfirm {
    async fn confirm(&self, _title: &str, _content: &str) -> bool {
        true
    }
}

/// Prompt that always declines.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverConfirm;

#[async_trait]
impl Prompt for NeverConfirm {
    async fn confirm(&self, _title: &str, _content: &str) -> bool {
        false
    }
}
