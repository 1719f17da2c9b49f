// SPDX-FileCopyrightText: 2026 Framegrid Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Framegrid - keyframe grid previews for videos posted to a bot account.
//!
//! This is the binary entry point. Each `run` is one batch cycle; schedule
//! it with cron or a systemd timer.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod run;
mod status;

use clap::{Parser, Subcommand};
use framegrid_config::model::FramegridConfig;

/// Framegrid - keyframe grid previews for videos posted to a bot account.
#[derive(Parser, Debug)]
#[command(name = "framegrid", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one ingestion and processing cycle.
    Run,
    /// Show job counts by state and the cursor offset.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Return stale `processing` jobs to `pending` now.
    Reclaim {
        /// Override `queue.stale_after_secs`.
        #[arg(long)]
        older_than_secs: Option<u64>,
    },
    /// Print the effective configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match framegrid_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            framegrid_config::render_errors(&errors);
            std::process::exit(2);
        }
    };

    let code = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            init_tracing(&config.agent.log_level);
            match run::run_cycle(config).await {
                Ok(report) if report.is_ok() => 0,
                Ok(_) => 1,
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            }
        }
        Commands::Status { json } => report(status::run_status(&config, json).await),
        Commands::Reclaim { older_than_secs } => {
            report(status::run_reclaim(&config, older_than_secs).await)
        }
        Commands::Config => report(print_config(&config)),
    };
    std::process::exit(code);
}

fn report(result: Result<(), framegrid_core::GridError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("error: {e}");
            1
        }
    }
}

fn print_config(config: &FramegridConfig) -> Result<(), framegrid_core::GridError> {
    let rendered = toml::to_string_pretty(&redacted(config)).map_err(|e| {
        framegrid_core::GridError::Internal(format!("failed to render config: {e}"))
    })?;
    print!("{rendered}");
    Ok(())
}

fn redacted(config: &FramegridConfig) -> FramegridConfig {
    let mut shown = config.clone();
    if shown.telegram.bot_token.is_some() {
        shown.telegram.bot_token = Some("<redacted>".to_string());
    }
    shown
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `agent.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("framegrid={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
