use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kvbox",
    about = "kvbox: a persistent key/value box with pluggable codecs",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage root, overriding the config file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show which storage backend is usable
    Probe,
    /// Store a JSON value under a name
    Set(SetArgs),
    /// Print the value stored under a name
    Get(GetArgs),
    /// Report whether a name holds a value
    Has(NameArgs),
    /// Remove a name
    Unset(NameArgs),
    /// Remove every entry
    Empty,
    /// Print the whole store as one document
    Dump(DumpArgs),
    /// Merge a document into the store
    Load(LoadArgs),
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}

#[derive(Args)]
pub struct SetArgs {
    pub name: String,
    /// Value as JSON text
    pub value: String,
}

#[derive(Args)]
pub struct GetArgs {
    pub name: String,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct DumpArgs {
    /// Output format (json, serialize, pickle)
    #[arg(short, long)]
    pub format: Option<String>,
}

#[derive(Args)]
pub struct LoadArgs {
    /// Input format (json, serialize, pickle)
    #[arg(short, long)]
    pub format: Option<String>,
    /// Document file; `-` or nothing reads standard input
    pub file: Option<PathBuf>,
}
