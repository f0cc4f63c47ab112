use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "equiflow")]
#[command(about = "Equipment parameter summary service")]
#[command(version)]
pub struct Cli {
    /// Path to the TOML config file (defaults to ~/.config/equiflow/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind, e.g. 127.0.0.1:8080 (overrides config)
    #[arg(long)]
    pub bind: Option<String>,

    /// SQLite database path (overrides config)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Accept an additional bearer token, repeatable
    #[arg(long, value_name = "TOKEN=USER")]
    pub token: Vec<String>,

    /// Show debug-level logs
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,
}
