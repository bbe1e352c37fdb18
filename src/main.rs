use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use crimson::logger::{self, LogConfig, LogFormat};
use crimson::{Config, ServerLauncher};

#[derive(Parser, Debug)]
#[command(author, version, about = "Crimson game server")]
struct Cli {
    /// Configuration file, defaults to conf/config.yml in the working directory
    #[arg(long, env = "CRIMSON_CONFIG")]
    config: Option<PathBuf>,

    /// Log output: pretty, compact, json
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(LogConfig::with_format(cli.log_format));

    let path = cli.config.unwrap_or_else(Config::default_path);
    ServerLauncher::from_path(path)?.launch().await
}
