use control_plane::{
    db, handlers,
    services::{ActivityLog, CredentialVault, HealthChecker, SecretCipher, ServerRegistry},
    AppState,
};

use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "control_plane=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let pool = db::create_pool().await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&pool).await?;

    // Initialize services
    let cipher = SecretCipher::from_env()?;
    let vault = CredentialVault::new(pool.clone(), cipher);
    let logs = ActivityLog::new(pool.clone());
    let registry = Arc::new(ServerRegistry::new(pool.clone(), vault, logs));
    let checker = Arc::new(HealthChecker::from_env());

    let app_state = AppState {
        registry,
        checker,
        pool,
    };

    let app = handlers::router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let addr: SocketAddr = std::env::var("CONTROL_PLANE_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8700".to_string())
        .parse()?;

    tracing::info!("Control plane listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
