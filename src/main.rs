use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cinevault::core::auth::{
    ApiState, AuthGate, AuthService, BcryptHasher, TokenCodec, user_router,
};
use cinevault::core::config::Config;
use cinevault::core::db::{
    DbConfig, PgCredentialStore, PgPool, create_pool_with_migrations, health_check,
};

#[tokio::main]
async fn main() {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load application config from environment variables
    let config = Config::from_env();

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, jwt_secret={}",
        config.has_database(),
        config.has_jwt_secret()
    );

    let db_config = DbConfig::from_env().expect("DATABASE_URL must be set");
    let pool = create_pool_with_migrations(&db_config)
        .await
        .expect("Failed to connect to database");

    // The signing secret is read once here and injected; nothing else
    // touches the environment for it
    let codec = TokenCodec::new(config.jwt_secret_or_panic());
    let auth = AuthService::new(
        Arc::new(PgCredentialStore::new(pool.clone())),
        Arc::new(BcryptHasher),
        codec.clone(),
    );
    let gate = AuthGate::new(codec);

    let app = Router::new()
        .merge(user_router(ApiState { auth, gate }))
        .merge(health_router(pool))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.bind_addr().to_string();
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app.into_make_service())
        .await
        .unwrap();
}

fn health_router(pool: PgPool) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(pool)
}

async fn health_handler(State(pool): State<PgPool>) -> StatusCode {
    match health_check(&pool).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
