use cichlid_peers::config::Args;
use cichlid_peers::new_store;
use cichlid_peers::shutdown::{cancel_on_ctrl_c, report_task_exit};
use cichlid_peers::{console, sweeper};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout belongs to the console
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();
    if let Err(e) = args.validate() {
        error!("Error: {}", e);
        std::process::exit(1);
    }

    let version = env!("CARGO_PKG_VERSION");
    let build = option_env!("GIT_COMMIT_HASH").unwrap_or("unknown");
    info!("cichlid-peers {} ({})", version, build);

    let store = new_store();
    let shutdown = CancellationToken::new();

    tokio::spawn(cancel_on_ctrl_c(shutdown.clone()));

    let sweeper_handle = tokio::spawn({
        let store = store.clone();
        let shutdown = shutdown.clone();
        let enabled = !args.no_sweeper;
        let max_age = args.max_age();
        let interval = args.sweep_interval();
        async move {
            if enabled {
                sweeper::run_sweeper(store, max_age, interval, shutdown).await;
            } else {
                info!("Sweeper disabled");
            }
        }
    });

    let console_handle = tokio::spawn({
        let store = store.clone();
        let shutdown = shutdown.clone();
        let enabled = !args.no_console;
        async move {
            if !enabled {
                return;
            }
            if let Err(e) = console::run_stdio_console(store, shutdown).await {
                error!("Console error: {}", e);
            }
        }
    });

    // Wait for both the sweeper and the console to exit
    let (sweeper_result, console_result) = tokio::join!(sweeper_handle, console_handle);
    report_task_exit("sweeper", sweeper_result);
    report_task_exit("console", console_result);

    info!(tracked_peers = store.len(), "Exiting");
    Ok(())
}
