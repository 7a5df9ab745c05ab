use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub const DEFAULT_CONFIG_PATH: &str = "gex.yaml";

#[derive(Parser, Debug)]
#[command(name = "gexd")]
#[command(about = "Gamma exposure service for crypto options")]
#[command(version)]
pub struct Cli {
    /// Log output format (pretty, json, compact); overrides the config file
    #[arg(long, global = true, env = "GEX_LOG_FORMAT")]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP API
    Serve {
        /// Path to the configuration file; built-in defaults when omitted
        #[arg(short, long, env = "GEX_CONFIG")]
        config: Option<PathBuf>,

        /// Override the listen host
        #[arg(long)]
        host: Option<String>,

        /// Override the listen port
        #[arg(long)]
        port: Option<u16>,
    },

    /// Compute one report and print it as JSON
    Snapshot {
        /// Path to the configuration file; built-in defaults when omitted
        #[arg(short, long, env = "GEX_CONFIG")]
        config: Option<PathBuf>,

        /// Underlying asset, e.g. BTC or ETH
        #[arg(short, long, default_value = "BTC")]
        asset: String,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Validate a configuration file without starting anything
    Validate {
        /// Path to the configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
    },

    /// Write a configuration file with all defaults
    Init {
        /// Output path for the new configuration file
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        output: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
