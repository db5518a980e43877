use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::TriageEngine;

use api_rest::runtime::runtime_from_env;

/// Main entry point for the triage service
///
/// Serves the REST API and runs the periodic reassessment-overdue scan side by side.
/// A `.env` file in the working directory is loaded first if present.
///
/// # Environment Variables
/// - `TRIAGE_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `TRIAGE_OVERDUE_SCAN_SECS`: Seconds between overdue scans (default: 60)
/// - See [`runtime_from_env`] for the remaining `TRIAGE_*` settings
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("triage=info".parse()?)
                .add_directive("triage_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = runtime_from_env()?;
    let engine = runtime.engine;

    tracing::info!(
        "++ Overdue scan every {}s",
        engine.config().overdue_scan_interval().as_secs()
    );
    tracing::info!("++ Starting triage REST on {}", runtime.rest_addr);

    let scanner = tokio::spawn(run_overdue_scans(engine.clone()));

    let app = api_rest::router(engine);
    let listener = tokio::net::TcpListener::bind(&runtime.rest_addr).await?;
    let served = axum::serve(listener, app).await;

    scanner.abort();
    served.map_err(anyhow::Error::from)
}

/// Scan for overdue reassessments forever. A failed scan is logged and retried next tick.
async fn run_overdue_scans(engine: TriageEngine) {
    let mut ticker = tokio::time::interval(engine.config().overdue_scan_interval());
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let monitor = engine.monitor();
        match tokio::task::spawn_blocking(move || monitor.scan_overdue()).await {
            Ok(Ok(overdue)) if !overdue.is_empty() => {
                tracing::info!(count = overdue.len(), "overdue scan complete")
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::error!("Overdue scan failed: {}", e),
            Err(e) => tracing::error!("Overdue scan task panicked: {}", e),
        }
    }
}
