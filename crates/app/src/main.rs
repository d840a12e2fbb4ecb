mod config;
mod routes;

use anyhow::{Context, Result};
use services::{AppServices, Clock};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Invocation, print_usage};

async fn run() -> Result<()> {
    // Load .env file if present (development)
    let _ = dotenvy::dotenv();

    let invocation = Config::resolve(std::env::args().skip(1), |key| std::env::var(key).ok())
        .inspect_err(|_| print_usage())?;
    let config = match invocation {
        Invocation::Run(config) => config,
        Invocation::Help => {
            print_usage();
            return Ok(());
        }
    };
    tracing::info!(
        data_file = %config.data_file.display(),
        port = config.port,
        offset = %config.offset,
        "configuration loaded"
    );

    // Creating the document here keeps core/services free of startup concerns.
    let app = AppServices::new_json_file(&config.data_file, Clock::default_clock(), config.offset)
        .await
        .with_context(|| format!("failed to open {}", config.data_file.display()))?;

    let router = routes::build_router(app.tally());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await
        .context("server error")?;

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tally=debug,services=debug,storage=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        tracing::error!("{err:#}");
        std::process::exit(2);
    }
}
