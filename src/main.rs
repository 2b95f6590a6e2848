use api_rest::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for Clerk.
///
/// Loads `.env`, resolves configuration once and serves the REST API.
///
/// # Environment Variables
/// - `CLERK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLERK_RECORD_DATA_DIR`: Directory for record storage (default: "record_data")
/// - `CLERK_PERMISSIONS_FILE`: Optional YAML permission matrix replacing the built-in one
///
/// # Errors
/// Returns an error if configuration is invalid, the address cannot be bound, or the server
/// fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clerk_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("workflow=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("CLERK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let state = AppState::from_env()?;

    tracing::info!("++ Starting Clerk REST on {}", rest_addr);

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
