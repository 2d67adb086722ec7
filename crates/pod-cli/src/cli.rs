use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "pod",
    about = "Read, write and watch resources on a Solid pod",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Base URI that relative resource paths are resolved against
    #[arg(long, global = true)]
    pub pod: Option<String>,

    /// Bearer token sent with every request
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch a resource and print its content
    Read(ReadArgs),
    /// List the children of a container
    Ls(UriArgs),
    /// Create a container unless it exists
    Mkdir(UriArgs),
    /// Upload a file to a leaf
    Put(PutArgs),
    /// Delete a resource, containers recursively
    Rm(UriArgs),
    /// Find the storage root above a resource
    Root(UriArgs),
    /// Read or write access rules
    Acl(AclArgs),
    /// Print notifications for a resource until interrupted
    Watch(UriArgs),
    /// List the storages a WebID advertises
    Storage(StorageArgs),
}

#[derive(Args)]
pub struct UriArgs {
    pub uri: String,
}

#[derive(Args)]
pub struct ReadArgs {
    pub uri: String,
    /// Write binary content to this file instead of describing it
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct PutArgs {
    pub uri: String,
    #[arg(long)]
    pub file: PathBuf,
    /// Media type of the upload; guessed from the file extension if omitted
    #[arg(long)]
    pub mime: Option<String>,
    /// Replace an existing resource
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct StorageArgs {
    pub webid: String,
}

#[derive(Args)]
pub struct AclArgs {
    #[command(subcommand)]
    pub action: AclAction,
}

#[derive(Subcommand)]
pub enum AclAction {
    /// Show the rule in effect, inherited or not
    Get {
        uri: String,
        /// Skip cached ACL lookups
        #[arg(long)]
        fresh: bool,
    },
    /// Replace the resource's own ACL
    Set {
        uri: String,
        /// Modes for everyone, e.g. `r` or `r,w`
        #[arg(long)]
        public: Option<String>,
        /// Modes for any logged-in agent
        #[arg(long)]
        authenticated: Option<String>,
        /// `<webid>=<modes>`, repeatable
        #[arg(long = "agent", value_parser = parse_agent_grant)]
        agents: Vec<(String, String)>,
    },
}

fn parse_agent_grant(value: &str) -> Result<(String, String), String> {
    match value.rsplit_once('=') {
        Some((webid, modes)) if !webid.is_empty() => Ok((webid.to_string(), modes.to_string())),
        _ => Err(format!("expected <webid>=<modes>, got '{value}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_grants_split_on_last_equals() {
        assert_eq!(
            parse_agent_grant("https://a.example/card?x=1#me=r,w").unwrap(),
            ("https://a.example/card?x=1#me".to_string(), "r,w".to_string())
        );
        assert!(parse_agent_grant("=r").is_err());
        assert!(parse_agent_grant("no-modes").is_err());
    }

    #[test]
    fn acl_set_parses() {
        let cli = Cli::try_parse_from([
            "pod", "acl", "set", "https://pod.example/doc.ttl", "--public", "r",
            "--agent", "https://a.example/card#me=r,w,c", "--format", "json",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Acl(AclArgs { action: AclAction::Set { public, agents, .. } }) = cli.command else {
            panic!("expected acl set");
        };
        assert_eq!(public.as_deref(), Some("r"));
        assert_eq!(agents.len(), 1);
    }
}
