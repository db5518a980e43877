//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when you only want the REST server (with
//! OpenAPI/Swagger UI). The workspace's main `triage-run` binary also runs the periodic overdue
//! scan; here scans only happen through `POST /monitor/scan`.

use api_rest::runtime::runtime_from_env;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the triage REST API server.
///
/// See [`runtime_from_env`] for the environment variables read at startup.
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - configuration or the protocol catalog is invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("triage_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = runtime_from_env()?;

    tracing::info!("-- Starting triage REST API on {}", runtime.rest_addr);

    let app = api_rest::router(runtime.engine);
    let listener = tokio::net::TcpListener::bind(&runtime.rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
