use anyhow::Context;
use colored::Colorize;
use kodb::{ConnectOptions, Kodb, Object};
use serde_json::{json, Value};

use crate::cli::*;

/// What a command produced, before formatting.
#[derive(Debug, PartialEq)]
pub enum Reply {
    Done(String),
    Flag(bool),
    Count(u64),
    Key(String),
    Object(Option<Object>),
    Members(Vec<String>),
}

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let options = resolve_options(&cli)?;
    let db = Kodb::remote();
    db.connect_with(&options)
        .await
        .with_context(|| format!("connecting to {}", options.address))?;
    tracing::debug!(address = %options.address, "connected");

    let reply = execute_then_disconnect(&db, cli.command).await?;
    println!("{}", render(&reply, &cli.format));
    Ok(())
}

/// Run one command and close the session. The command's own outcome wins;
/// a failed disconnect is only logged.
pub async fn execute_then_disconnect(db: &Kodb, command: Command) -> anyhow::Result<Reply> {
    let result = execute(db, command).await;
    if let Err(e) = db.disconnect().await {
        tracing::warn!("disconnect failed: {}", e);
    }
    result
}

/// Config file first, then command-line overrides.
pub fn resolve_options(cli: &Cli) -> anyhow::Result<ConnectOptions> {
    let mut options = match &cli.config {
        Some(path) => ConnectOptions::from_file(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => ConnectOptions::default(),
    };
    if let Some(addr) = &cli.addr {
        options.address = addr.clone();
    }
    if let Some(password) = &cli.password {
        options.password = Some(password.clone());
    }
    if let Some(db) = cli.db {
        options.database = db;
    }
    Ok(options)
}

pub async fn execute(db: &Kodb, command: Command) -> anyhow::Result<Reply> {
    let reply = match command {
        Command::Ping => Reply::Done("connected".into()),
        Command::Load(args) => Reply::Object(Some(db.load_object(&args.key).await?)),
        Command::Save(args) => {
            let value: Value = serde_json::from_str(&args.json).context("parsing JSON argument")?;
            db.save_object(&args.key, &value).await?;
            Reply::Done(format!("saved {}", args.key))
        }
        Command::DeleteObject(args) => {
            db.delete_object(&args.key).await?;
            Reply::Done(format!("deleted {}", args.key))
        }
        Command::IsObject(args) => Reply::Flag(db.is_object(&args.key).await?),
        Command::Get(args) => Reply::Object(db.get(&args.key).await?),
        Command::CreateSet(args) => {
            db.create_set(&args.key).await?;
            Reply::Done(format!("created set {}", args.key))
        }
        Command::DeleteSet(args) => {
            db.delete_set(&args.key).await?;
            Reply::Done(format!("deleted set {}", args.key))
        }
        Command::ClearSet(args) => {
            db.clear_set(&args.key).await?;
            Reply::Done(format!("cleared set {}", args.key))
        }
        Command::IsSet(args) => Reply::Flag(db.is_set(&args.key).await?),
        Command::Sadd(args) => {
            let mut added = 0;
            for member in &args.members {
                added += u64::from(db.add_to_set(&args.key, member).await?);
            }
            Reply::Count(added)
        }
        Command::Srem(args) => {
            let mut removed = 0;
            for member in &args.members {
                removed += u64::from(db.remove_from_set(&args.key, member).await?);
            }
            Reply::Count(removed)
        }
        Command::Sismember(args) => Reply::Flag(db.exists_in_set(&args.key, &args.member).await?),
        Command::Members(args) => {
            let mut members = db.get_set_members(&args.key).await?;
            members.sort();
            Reply::Members(members)
        }
        Command::Card(args) => Reply::Count(db.get_set_cardinality(&args.key).await?),
        Command::Del(args) => Reply::Count(db.delete_key(&args.key).await?),
        Command::Exists(args) => Reply::Flag(db.exists_key(&args.key).await?),
        Command::UniqueKey(args) => Reply::Key(db.get_unique_key(args.length).await?),
    };
    Ok(reply)
}

pub fn render(reply: &Reply, format: &OutputFormat) -> String {
    match format {
        OutputFormat::Json => render_json(reply).to_string(),
        OutputFormat::Text => render_text(reply),
    }
}

fn render_json(reply: &Reply) -> Value {
    match reply {
        Reply::Done(msg) => json!({ "ok": true, "message": msg }),
        Reply::Flag(b) => json!(b),
        Reply::Count(n) => json!(n),
        Reply::Key(k) => json!(k),
        Reply::Object(Some(obj)) => Value::Object(obj.clone()),
        Reply::Object(None) => Value::Null,
        Reply::Members(m) => json!(m),
    }
}

fn render_text(reply: &Reply) -> String {
    match reply {
        Reply::Done(msg) => format!("{} {}", "✓".green().bold(), msg),
        Reply::Flag(true) => "yes".green().to_string(),
        Reply::Flag(false) => "no".red().to_string(),
        Reply::Count(n) => n.to_string().bold().to_string(),
        Reply::Key(k) => k.yellow().to_string(),
        Reply::Object(Some(obj)) => serde_json::to_string_pretty(obj).unwrap_or_default(),
        Reply::Object(None) => "(nil)".dimmed().to_string(),
        Reply::Members(m) if m.is_empty() => "(empty set)".dimmed().to_string(),
        Reply::Members(m) => m
            .iter()
            .enumerate()
            .map(|(i, member)| format!("{}) {}", i + 1, member))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
