#![cfg_attr(test, allow(clippy::disallowed_methods))]
// Forbid unwrap() in production code; a bad config or provider response must not panic.
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
use std::net::SocketAddr;

use receiver::auth::TokenVerifier;
use receiver::config::ReceiverConfig;
use receiver::routes::{AppState, router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "receiver=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment variables
    let config = match ReceiverConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Loaded configuration: tenant_id={}, authority={}, listen_port={}, cache_ttl={:?}",
        config.tenant_id,
        config.provider.authority,
        config.listen_port,
        config.provider.cache_ttl
    );

    let verifier = match TokenVerifier::from_settings(&config.provider) {
        Ok(verifier) => verifier,
        Err(e) => {
            tracing::error!("Failed to create HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(verifier, config.validation_options());
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.listen_port));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to bind: {e}");
            std::process::exit(1);
        });

    axum::serve(listener, app).await.unwrap_or_else(|e| {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    });
}
