//! Standalone REST API server binary.
//!
//! Useful in development when only the REST server is wanted. The workspace's main `clerk-run`
//! binary also loads `.env` before starting the same router.

use api_rest::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// # Environment Variables
/// - `CLERK_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CLERK_RECORD_DATA_DIR`: Record storage directory (default: "record_data")
/// - `CLERK_PERMISSIONS_FILE`: Optional permission matrix YAML
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLERK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    tracing::info!("-- Starting Clerk REST API on {}", addr);

    let app = router(AppState::from_env()?);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
