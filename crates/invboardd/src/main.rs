//! invboardd: the invboard daemon.
//!
//! Verifies the inventory backend version, then serves the dashboard and
//! its static assets.
//!
//! # Usage
//!
//! ```text
//! invboardd serve --config /etc/invboard/invboardd.toml --bind 0.0.0.0:5000
//! ```
//!
//! Exits with status 1 when the backend version is unsupported and 2 when
//! it cannot be determined.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use clap::{Parser, Subcommand};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use invboard_client::{HttpBackend, HttpBackendConfig};
use invboard_dashboard::{DashboardState, StaticUrls, check_db_version, dashboard_router};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "invboardd", about = "Inventory dashboard daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the backend and serve the dashboard.
    Serve {
        /// TOML config file; defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Address to listen on (overrides `server.bind`).
        #[arg(long)]
        bind: Option<SocketAddr>,

        /// Backend base URL (overrides `backend.url`).
        #[arg(long)]
        backend_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,invboardd=debug,invboard=debug")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            bind,
            backend_url,
        } => {
            let mut config = match config {
                Some(path) => Config::from_file(&path)?,
                None => Config::default(),
            };
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(url) = backend_url {
                config.backend.url = url;
            }
            serve(config).await
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let backend = HttpBackend::new(&HttpBackendConfig {
        url: config.backend.url.clone(),
        timeout: config.backend.timeout()?,
    })?;
    info!(url = %backend.base_url(), "backend configured");

    if let Err(e) = check_db_version(&backend).await {
        std::process::exit(e.exit_code());
    }

    let static_urls = StaticUrls::new(config.server.static_prefix.as_str());
    let state =
        DashboardState::new(backend, static_urls.clone()).with_page_size(config.backend.page_size);

    let mut router = dashboard_router(state);
    if !static_urls.prefix().is_empty() {
        router = router.nest_service(static_urls.prefix(), ServeDir::new(&config.server.static_dir));
    }
    let router: Router = router.layer(TraceLayer::new_for_http());

    let addr = config.server.bind;
    info!(%addr, static_dir = ?config.server.static_dir, "dashboard starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("invboard daemon stopped");
    Ok(())
}
