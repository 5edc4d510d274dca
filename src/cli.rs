//! CLI argument parsing with subcommand architecture.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "loggate", version, about = "Request-scoped user logging context for HTTP services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the server (default when no subcommand is given)
    Run(RunArgs),
    /// Load the config file and print the resolved user logging settings
    CheckConfig(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "LOGGATE_CONFIG")]
    pub config: String,

    /// Listen host
    #[arg(long, env = "LOGGATE_HOST")]
    pub host: Option<String>,

    /// Listen port
    #[arg(long, env = "LOGGATE_PORT")]
    pub port: Option<u16>,

    /// Log level (overrides config)
    #[arg(long, env = "LOGGATE_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            config: "config.yaml".to_string(),
            host: None,
            port: None,
            log_level: None,
        }
    }
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Path to config file
    #[arg(short, long, default_value = "config.yaml", env = "LOGGATE_CONFIG")]
    pub config: String,
}
