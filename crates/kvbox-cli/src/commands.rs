use std::fs;
use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context};
use colored::Colorize;
use kvbox_codec::json::{self, Indent};
use kvbox_sdk::{ProbeOutcome, Store, StoreConfig};
use kvbox_types::Value;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let store = Store::open(&config).context("failed to open store")?;
    match cli.command {
        Command::Probe => cmd_probe(&store),
        Command::Set(args) => cmd_set(&store, args),
        Command::Get(args) => cmd_get(&store, args),
        Command::Has(args) => {
            println!("{}", store.isset(&args.name)?);
            Ok(())
        }
        Command::Unset(args) => {
            store.unset(&args.name)?;
            println!("{} Removed {}", "✓".green(), args.name.bold());
            Ok(())
        }
        Command::Empty => {
            store.empty()?;
            println!("{} Store emptied", "✓".green());
            Ok(())
        }
        Command::Dump(args) => {
            println!("{}", store.dumps(args.format.as_deref())?);
            Ok(())
        }
        Command::Load(args) => cmd_load(&store, args),
    }
}

/// Config file if given, defaults otherwise, then `--root` on top.
fn load_config(cli: &Cli) -> anyhow::Result<StoreConfig> {
    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.backend.root = root.clone();
    }
    Ok(config)
}

fn cmd_probe(store: &Store) -> anyhow::Result<()> {
    if let Some(report) = store.probe_report() {
        for attempt in report.attempts() {
            match &attempt.outcome {
                ProbeOutcome::Usable => {
                    println!("  {} {}", "usable".green(), attempt.kind.as_str().bold())
                }
                ProbeOutcome::Unusable(reason) => println!(
                    "  {} {} ({})",
                    "unusable".red(),
                    attempt.kind.as_str().bold(),
                    reason.dimmed()
                ),
            }
        }
    }
    match store.backend_name() {
        Some(name) => println!("{} Using {} backend", "✓".green().bold(), name.cyan()),
        None => println!("{} No usable storage", "✗".red().bold()),
    }
    Ok(())
}

fn cmd_set(store: &Store, args: SetArgs) -> anyhow::Result<()> {
    let value = json::parse(&args.value)
        .with_context(|| format!("value for {} is not valid JSON", args.name))?;
    store.store(&args.name, &value)?;
    println!("{} Stored {}", "✓".green(), args.name.bold());
    Ok(())
}

fn cmd_get(store: &Store, args: GetArgs) -> anyhow::Result<()> {
    let value = store.fetch(&args.name)?;
    println!("{}", render(&value, args.pretty));
    Ok(())
}

fn render(value: &Value, pretty: bool) -> String {
    let text = if pretty {
        json::to_string_pretty(value, Indent::Spaces(2))
    } else {
        json::to_string(value)
    };
    text.unwrap_or_else(|| "null".to_string())
}

fn cmd_load(store: &Store, args: LoadArgs) -> anyhow::Result<()> {
    let data = read_input(args.file.as_deref())?;
    if data.trim().is_empty() {
        bail!("nothing to load");
    }
    store
        .loads(&data, args.format.as_deref())
        .context("failed to load document")?;
    println!("{} Loaded document", "✓".green());
    Ok(())
}

/// Read a file, or standard input for `None` and `-`.
fn read_input(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        _ => {
            let mut data = String::new();
            io::stdin()
                .read_to_string(&mut data)
                .context("failed to read standard input")?;
            Ok(data)
        }
    }
}
