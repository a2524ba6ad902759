//! Civic Ledger
//!
//! Local REST backend for anonymous civic-incident reporting: pseudonymous
//! identity, a report feed with credibility voting, topic following and an
//! alert inbox.

mod alerts;
mod api;
mod auth;
mod comments;
mod config;
mod db;
mod errors;
mod identity;
mod ledger;
mod models;
mod session;
mod source;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::{Config, DataSourceKind};
use db::Repository;
use identity::{FileStore, IdentityProvider};
use session::Session;
use source::{FixtureSource, PostSource, SqliteSource};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub source: Arc<dyn PostSource>,
    pub config: Arc<Config>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Civic Ledger");
    tracing::info!("Data source: {:?}", config.data_source);
    tracing::info!("Identity path: {:?}", config.identity_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (CIVIC_API_PSK). Authentication is disabled!");
    }

    let source = open_source(&config).await?;
    let state = build_state(config.clone(), source).await?;

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Open the configured feed source.
pub async fn open_source(config: &Config) -> Result<Arc<dyn PostSource>, errors::AppError> {
    match config.data_source {
        DataSourceKind::Fixtures => Ok(Arc::new(FixtureSource)),
        DataSourceKind::Sqlite => {
            tracing::info!("Database path: {:?}", config.db_path);
            let pool = db::init_database(&config.db_path).await?;
            Ok(Arc::new(SqliteSource::new(Repository::new(pool))))
        }
    }
}

/// Load the feed and set up the viewer session.
pub async fn build_state(
    config: Config,
    source: Arc<dyn PostSource>,
) -> Result<AppState, errors::AppError> {
    let feed = source.load_feed().await?;
    tracing::info!(
        "Loaded {} posts, {} votes and {} comments from {} source",
        feed.posts.len(),
        feed.votes.len(),
        feed.comments.len(),
        source.name()
    );

    let mut identity = match &config.identity_path {
        Some(path) => IdentityProvider::new(FileStore::new(path)),
        None => IdentityProvider::in_memory(),
    };
    let pseudonym = identity.get_or_create_identity().id;
    if identity.is_degraded() {
        tracing::warn!("Identity {} will not outlive this process", pseudonym);
    }
    tracing::info!("Viewing as {}", pseudonym);

    Ok(AppState {
        session: Arc::new(Mutex::new(Session::from_feed(identity, feed))),
        source,
        config: Arc::new(config),
    })
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let psk = state.config.api_psk.clone();

    let api_routes = Router::new()
        // Identity
        .route("/identity", get(api::get_identity).delete(api::rotate_identity))
        // Posts
        .route("/posts", get(api::list_posts).post(api::create_post))
        .route("/posts/{id}", get(api::get_post))
        .route("/posts/{id}/vote", get(api::get_vote).post(api::toggle_vote))
        .route(
            "/posts/{id}/comments",
            get(api::list_comments).post(api::create_comment),
        )
        // Topics
        .route("/topics", get(api::list_topics).post(api::follow_topic))
        .route("/topics/{topic_type}/{value}", delete(api::unfollow_topic))
        // Alerts
        .route("/alerts", get(api::list_alerts).post(api::ingest_alert))
        .route("/alerts/read-all", post(api::mark_all_alerts_read))
        .route("/alerts/{id}/read", post(api::mark_alert_read))
        .route("/alerts/{id}", delete(api::dismiss_alert))
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
