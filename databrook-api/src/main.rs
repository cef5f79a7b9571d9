mod config;
mod routes;
mod state;

use config::Config;
use databrook_app::infrastructure::auth::GoogleOAuth;
use databrook_app::infrastructure::db::{create_connection, run_migrations};
use databrook_app::AppContext;
use state::ApiState;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let db = match create_connection(&config.database_url).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = run_migrations(&db).await {
        tracing::error!("Failed to run migrations: {}", e);
        std::process::exit(1);
    }
    tracing::info!("Database ready");

    let oauth = config.google.as_ref().and_then(|google| {
        GoogleOAuth::new(&google.client_id, &google.client_secret, &google.redirect_uri)
            .inspect_err(|e| tracing::warn!("Google sign-in disabled: {}", e))
            .ok()
    });

    let state = ApiState {
        app: AppContext::new(db),
        oauth,
    };

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.cookie_secure);

    let app = routes::router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind address");
    tracing::info!("Listening on http://{}", config.bind_addr);

    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
