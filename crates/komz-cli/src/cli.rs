//! Command-line argument definitions.

use clap::{Parser, Subcommand};

/// Komz demo gateway
#[derive(Parser, Debug)]
#[command(name = "komz")]
#[command(version, about = "Backend for the Komz Consulting demo widgets", long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP gateway
    Serve {
        /// Override the listen host
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Chat with the assistant in the terminal
    Chat,

    /// Provision a web call and print the provider's response
    Call {
        /// Agent to call; defaults to RETELL_AGENT_ID
        #[arg(short, long)]
        agent_id: Option<String>,
    },

    /// Inspect or edit configuration
    Config {
        /// Config action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// `komz config` actions.
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the config file path in use
    Path,

    /// Print one value by dotted key (e.g. `server.port`)
    Get {
        /// Dotted key
        key: String,
    },

    /// Write one value by dotted key into the config file
    Set {
        /// Dotted key
        key: String,
        /// New value; booleans and numbers are detected
        value: String,
    },

    /// Write a default config file
    Init {
        /// Where to write it; defaults to the standard location
        #[arg(short, long)]
        file: Option<String>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration with keys masked
    Show,

    /// Print the effective configuration as environment variables
    Export {
        /// Format as `--env KEY=VALUE` for docker
        #[arg(long)]
        docker_env: bool,
    },
}
