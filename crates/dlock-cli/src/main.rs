//! dlock 命令行入口
//!
//! ```bash
//! # 查看锁键
//! dlock key nightly-report
//!
//! # 尝试一次
//! dlock try nightly-report
//!
//! # 最多等待 30 秒，获取后持有直到 Ctrl+C
//! dlock hold nightly-report --wait-timeout 30
//! ```

mod cli;
mod runner;

use std::process::ExitCode;

use clap::Parser;
use dlock_shared::{config::AppConfig, observability};

use crate::cli::{Cli, Commands};
use crate::runner::CommandRunner;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load("dlock").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if let Some(ms) = cli.poll_interval_ms {
        config.lock.poll_interval_ms = ms;
    }

    let _guard = observability::init(&config.observability)?;
    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::Key { name } => runner.run_key(&name),
        Commands::Try { name } => {
            if !runner.run_try(&name).await? {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Hold { name, wait_timeout } => runner.run_hold(&name, wait_timeout).await?,
    }

    Ok(ExitCode::SUCCESS)
}
