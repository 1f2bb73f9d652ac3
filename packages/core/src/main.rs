use std::sync::Arc;

use clap::Parser;
use dotenvy::dotenv;
use tokio::net::TcpListener;

use tool_tracker::api::{self, AppContext};
use tool_tracker::cli::{Cli, Command};
use tool_tracker::clock::SystemClock;
use tool_tracker::config::Config;
use tool_tracker::db::create_pool;
use tool_tracker::error::AppError;
use tool_tracker::lifecycle::ToolLifecycleEngine;
use tool_tracker::logging::init_logging;
use tool_tracker::metrics::AppMetrics;
use tool_tracker::repository::ToolRepository;
use tool_tracker::scheduler::run_expiry_audit;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    if let Err(err) = run(Cli::parse()).await {
        tracing::error!("{}", err);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(&cli).map_err(AppError::Config)?;
    tracing::info!(
        bind_addr = %config.bind_addr,
        low_usability_threshold = config.low_usability_threshold,
        expiring_window_days = config.expiring_window_days,
        "Configuration loaded"
    );

    let pool = create_pool(&config.database_url).await?;
    let repository = Arc::new(ToolRepository::new(pool));
    let engine = Arc::new(ToolLifecycleEngine::new(
        repository,
        Arc::new(SystemClock),
        config.lifecycle(),
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::BackfillExpiry { default_validity } => {
            let report = engine.backfill_expiry(default_validity).await?;
            tracing::info!(
                updated = report.updated,
                already_set = report.already_set,
                missing_supply_date = report.missing_supply_date,
                "Expiry backfill complete"
            );
            Ok(())
        }
        Command::Serve => serve(config, engine).await,
    }
}

async fn serve(config: Config, engine: Arc<ToolLifecycleEngine>) -> Result<(), AppError> {
    let metrics = Arc::new(AppMetrics::new().map_err(|e| AppError::Unknown(e.to_string()))?);

    tokio::spawn(run_expiry_audit(
        engine.clone(),
        metrics.clone(),
        config.audit_interval_seconds,
    ));

    let app = api::router(Arc::new(AppContext { engine, metrics }));

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|e| AppError::Config(format!("Cannot bind {}: {}", config.bind_addr, e)))?;
    tracing::info!("Listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Unknown(e.to_string()))?;

    tracing::info!("Server stopped cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
}
