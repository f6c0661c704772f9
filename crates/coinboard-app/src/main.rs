//! coinboard - live paginated crypto market board.

use anyhow::Result;
use clap::Parser;
use coinboard::{run_log_renderer, AppConfig, Application, ConfigLocation};
use coinboard_dashboard::{run_server, DashboardState};
use tracing::{error, info, warn};

/// Live paginated crypto market board
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via COINBOARD_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// One-based page to show first (overrides board.initial_page)
    #[arg(short, long)]
    page: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // TLS provider must be installed before the first feed connection.
    coinboard_ws::init_crypto();

    let args = Args::parse();

    let location = ConfigLocation::resolve(args.config.as_deref());
    let mut config = AppConfig::load(&location)?;
    if let Some(page) = args.page {
        config.board.initial_page = page;
        config.validate()?;
    }

    coinboard_telemetry::init_logging(&config.telemetry.log_level)?;
    info!("Starting coinboard v{}", env!("CARGO_PKG_VERSION"));
    if location.is_missing() {
        warn!(path = %location.path, "Config file not found, using defaults");
    }
    info!(
        primary = %config.primary.base_url,
        secondary = %config.secondary.base_url,
        feed = %config.feed.ws_url,
        page = config.board.initial_page,
        "Configuration loaded"
    );

    let app = Application::new(config.clone())?;

    tokio::spawn(run_log_renderer(app.view_receiver()));

    if config.dashboard.enabled {
        let state = DashboardState::new(app.view_receiver(), app.page_requests());
        let dashboard_config = config.dashboard.clone();
        tokio::spawn(async move {
            if let Err(e) = run_server(state, dashboard_config).await {
                error!(error = %e, "Dashboard server failed");
            }
        });
    }

    app.run().await?;

    Ok(())
}
