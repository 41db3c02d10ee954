use std::net::SocketAddr;
use std::sync::Arc;

use softcontrol_api::cache::Cache;
use softcontrol_api::config::Config;
use softcontrol_api::db;
use softcontrol_api::middleware::rate_limit::RateLimiter;
use softcontrol_api::services::stripe_service::StripeClient;
use softcontrol_api::{build_router, AppState};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .json()
        .init();

    let pool = db::create_pool(&config).await;
    let cache = Cache::new(&config).await;
    let stripe = StripeClient::new(&config.stripe);
    let rate_limiter =
        RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);
    let login_rate_limiter =
        RateLimiter::new(config.rate_limit.login_max, config.rate_limit.window_secs);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = AppState {
        db: pool,
        cache,
        config: Arc::new(config),
        stripe,
        rate_limiter,
        login_rate_limiter,
    };

    let router = build_router(state);

    tracing::info!("SoftControl API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server port");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
