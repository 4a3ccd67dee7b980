use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kodb",
    about = "kodb: JSON objects, existence-safe sets and unique keys on a key/value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Store address (host:port); overrides the config file
    #[arg(long, global = true)]
    pub addr: Option<String>,

    /// TOML file with connection settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Logical database index
    #[arg(long, global = true)]
    pub db: Option<u32>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check that the store is reachable
    Ping,
    /// Print the object stored at a key
    Load(KeyArgs),
    /// Store a JSON object at a key
    Save(SaveArgs),
    /// Delete the object stored at a key
    DeleteObject(KeyArgs),
    /// Check whether a key holds an object
    IsObject(KeyArgs),
    /// Print the object at a key, or nothing
    Get(KeyArgs),
    /// Create an empty set, replacing the key
    CreateSet(KeyArgs),
    /// Delete a set
    DeleteSet(KeyArgs),
    /// Remove every member of a set
    ClearSet(KeyArgs),
    /// Check whether a key holds a set
    IsSet(KeyArgs),
    /// Add members to a set
    Sadd(MembersArgs),
    /// Remove members from a set
    Srem(MembersArgs),
    /// Check whether a member is in a set
    Sismember(MemberArgs),
    /// List the members of a set
    Members(KeyArgs),
    /// Count the members of a set
    Card(KeyArgs),
    /// Delete a key whatever it holds
    Del(KeyArgs),
    /// Check whether a key exists
    Exists(KeyArgs),
    /// Generate a key that does not exist yet
    UniqueKey(UniqueKeyArgs),
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
}

#[derive(Args)]
pub struct SaveArgs {
    pub key: String,
    /// JSON object text, e.g. '{"a":1}'
    pub json: String,
}

#[derive(Args)]
pub struct MembersArgs {
    pub key: String,
    #[arg(required = true)]
    pub members: Vec<String>,
}

#[derive(Args)]
pub struct MemberArgs {
    pub key: String,
    pub member: String,
}

#[derive(Args)]
pub struct UniqueKeyArgs {
    /// Key length in hex characters (0 = 1024)
    #[arg(short = 'n', long, default_value = "32")]
    pub length: usize,
}
