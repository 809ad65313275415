use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use quorum_sdk::models::{ConfigGroup, ConfigItem, ConstantGroup};
use quorum_sdk::{
    AlwaysConfirm, AutoupdateFormat, AutoupdateOutcome, EntityId, Prompt, Repository, Session,
    SessionConfig, ViewModel,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::cli::*;
use crate::prompt::StdinPrompt;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = session_config(&cli)?;
    let prompt: Arc<dyn Prompt> = match &cli.command {
        Command::DeleteMotion(args) if !args.yes => Arc::new(StdinPrompt),
        _ => Arc::new(AlwaysConfirm),
    };
    let session = Session::open(config, None, prompt).await?;
    let format = cli.format;

    match cli.command {
        Command::Status => cmd_status(&session, format),
        Command::Apply(args) => cmd_apply(&session, args, format).await,
        Command::List(args) => cmd_list(&session, args, format),
        Command::Show(args) => cmd_show(&session, args, format),
        Command::Motions => cmd_motions(&session, format),
        Command::Config(args) => cmd_config(&session, args, format),
        Command::DeleteMotion(args) => cmd_delete_motion(&session, args).await,
        Command::Clear => {
            session.clear().await?;
            println!("{} Cache cleared.", "✓".green().bold());
            Ok(())
        }
    }
}

/// Config file first, then the `--cache-dir` flag on top.
fn session_config(cli: &Cli) -> anyhow::Result<SessionConfig> {
    let mut config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if let Some(dir) = &cli.cache_dir {
        config = config.with_cache_dir(dir);
    }
    debug!(?config, "session config");
    Ok(config)
}

fn read_json(path: &Path) -> anyhow::Result<Value> {
    let source =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&source).with_context(|| format!("parsing {}", path.display()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn cmd_status(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    let status = session.status();
    if format == OutputFormat::Json {
        return print_json(&serde_json::to_value(&status)?);
    }
    let cache = match &status.cache_dir {
        Some(dir) => dir.display().to_string(),
        None => "in memory".into(),
    };
    println!("Cache: {}", cache.bold());
    println!("Change id: {}", status.max_change_id.to_string().yellow().bold());
    if status.collections.is_empty() {
        println!("\nNo data cached.");
    }
    for (collection, count) in &status.collections {
        println!("  {:<20} {}", collection.cyan(), count);
    }
    Ok(())
}

async fn cmd_apply(session: &Session, args: ApplyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let update: AutoupdateFormat = serde_json::from_value(read_json(&args.file)?)
        .with_context(|| format!("{} is not an autoupdate", args.file.display()))?;
    let outcome = session.apply_autoupdate(update).await?;
    let change_id = session.max_change_id();

    if format == OutputFormat::Json {
        let label = match outcome {
            AutoupdateOutcome::Applied => "applied",
            AutoupdateOutcome::Replaced => "replaced",
            AutoupdateOutcome::Ignored => "ignored",
            AutoupdateOutcome::Gap { .. } => "gap",
        };
        return print_json(&json!({ "outcome": label, "max_change_id": change_id }));
    }
    match outcome {
        AutoupdateOutcome::Applied => {
            println!("{} Applied, change id now {}", "✓".green().bold(), change_id.to_string().yellow())
        }
        AutoupdateOutcome::Replaced => {
            println!("{} Replaced all data, change id now {}", "✓".green().bold(), change_id.to_string().yellow())
        }
        AutoupdateOutcome::Ignored => println!("Already up to date ({}).", change_id),
        AutoupdateOutcome::Gap { local, from } => println!(
            "{} Update starts at {} but the cache is at {}; a full update is required.",
            "!".red().bold(),
            from,
            local
        ),
    }
    Ok(())
}

fn cmd_list(session: &Session, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let store = session.store();
    if !store.registry().is_registered(&args.collection) {
        bail!("unknown collection {}", args.collection);
    }
    let entities = store.get_all(&args.collection);
    if format == OutputFormat::Json {
        let payloads = entities
            .iter()
            .map(|e| e.to_json())
            .collect::<Result<Vec<_>, _>>()?;
        return print_json(&Value::Array(payloads));
    }
    if entities.is_empty() {
        println!("No entries in {}.", args.collection.cyan());
    }
    for entity in &entities {
        let id = entity.id().map(|id| id.to_string()).unwrap_or_default();
        println!("{} {}", id.yellow(), entity.to_json()?);
    }
    Ok(())
}

fn cmd_show(session: &Session, args: ShowArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = EntityId::parse_key(&args.id);
    let Some(entity) = session.store().get(&args.collection, id.clone()) else {
        bail!("{}/{} not found", args.collection, id);
    };
    let payload = entity.to_json()?;
    if format == OutputFormat::Json {
        return print_json(&payload);
    }
    println!("{} {}", args.collection.cyan(), id.to_string().yellow().bold());
    if let Value::Object(fields) = payload {
        for (name, value) in fields {
            println!("  {:<20} {}", name, value);
        }
    }
    Ok(())
}

fn cmd_motions(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    let mut motions = session.motions().base().get_view_model_list();
    motions.sort_by_key(|m| (m.motion().weight, m.motion().id));

    if format == OutputFormat::Json {
        let rows = motions
            .iter()
            .map(|m| {
                json!({
                    "id": m.motion().id,
                    "title": m.title(),
                    "category": m.category().map(|c| c.name.clone()),
                    "submitters": m.submitters().iter().map(|u| u.short_name()).collect::<Vec<_>>(),
                    "state": m.state().map(|s| s.name.clone()),
                    "final": m.is_final_state(),
                })
            })
            .collect();
        return print_json(&Value::Array(rows));
    }
    if motions.is_empty() {
        println!("No motions.");
    }
    for m in &motions {
        let state = m.state().map(|s| s.name.as_str()).unwrap_or("?");
        let state = if m.is_final_state() {
            state.green()
        } else {
            state.yellow()
        };
        println!("{} [{}]", m.identifier_or_title().bold(), state);
        println!("  {}", m.motion().title);
        if let Some(category) = m.category() {
            println!("  Category: {}", category.name.cyan());
        }
        let submitters: Vec<String> = m.submitters().iter().map(|u| u.short_name()).collect();
        if !submitters.is_empty() {
            println!("  Submitters: {}", submitters.join(", "));
        }
    }
    Ok(())
}

fn cmd_config(session: &Session, args: ConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let configs = session.configs();
    let Some(path) = args.constants else {
        let mut views = configs.base().get_view_model_list();
        views.sort_by(|a, b| a.key().cmp(b.key()));
        if format == OutputFormat::Json {
            let map = views
                .iter()
                .map(|v| (v.key().to_string(), v.value().clone()))
                .collect();
            return print_json(&Value::Object(map));
        }
        for view in &views {
            println!("{} = {}", view.key().bold(), view.value());
        }
        return Ok(());
    };

    let constants: Vec<ConstantGroup> = serde_json::from_value(read_json(&path)?)
        .with_context(|| format!("{} is not a list of config groups", path.display()))?;
    configs.set_constants(&constants);
    let groups = configs.structure().unwrap_or_default();

    if format == OutputFormat::Json {
        return print_json(&Value::Array(groups.iter().map(group_json).collect()));
    }
    for group in &groups {
        println!("{}", group.name.bold().underline());
        print_items(&group.items, "  ");
        for subgroup in &group.subgroups {
            println!("  {}", subgroup.name.bold());
            print_items(&subgroup.items, "    ");
        }
    }
    Ok(())
}

fn item_value(item: &ConfigItem) -> Value {
    item.config
        .as_ref()
        .map(|c| c.value().clone())
        .unwrap_or_else(|| item.data.default_value.clone())
}

fn print_items(items: &[ConfigItem], indent: &str) {
    for item in items {
        let label = if item.data.label.is_empty() {
            item.key.as_str()
        } else {
            item.data.label.as_str()
        };
        let value = item_value(item).to_string();
        let value = if item.config.is_some() {
            value.normal()
        } else {
            value.dimmed()
        };
        println!("{indent}{label}: {value}");
    }
}

fn group_json(group: &ConfigGroup) -> Value {
    let items = |items: &[ConfigItem]| -> Value {
        items
            .iter()
            .map(|i| json!({ "key": i.key, "label": i.data.label, "value": item_value(i) }))
            .collect()
    };
    json!({
        "name": group.name,
        "items": items(&group.items),
        "subgroups": group
            .subgroups
            .iter()
            .map(|s| json!({ "name": s.name, "items": items(&s.items) }))
            .collect::<Vec<_>>(),
    })
}

async fn cmd_delete_motion(session: &Session, args: DeleteMotionArgs) -> anyhow::Result<()> {
    let Some(view) = session.motions().base().get_view_model(args.id) else {
        bail!("motion {} not found", args.id);
    };
    match session.motions().delete(&view).await {
        Ok(()) => {
            println!("{} Deleted {}", "✓".green().bold(), view.title().yellow());
            Ok(())
        }
        Err(e) if e.is_dialog_closed() => {
            println!("Aborted.");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
