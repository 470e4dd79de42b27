pub mod admin;
pub mod analytics;
mod config;
mod data_formats;
mod db_helpers;
pub mod dialogs;
mod errors;
mod extractors;
mod handlers;
pub mod models;
pub mod reading;
pub mod related;
pub mod tags;

use anyhow::Context;
pub use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{routing::*, Extension, Json, Router};
pub use config::Config;
pub use data_formats::*;
pub use errors::{ErrorBody, RequestError};
use handlers::*;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool};
use std::{
    net::{SocketAddr, TcpListener},
    sync::Arc,
};
use tower_http::trace::TraceLayer;

use analytics::{Analytics, EventStorage, FileStorage, MemoryStorage};

pub type JsonResponse<T> = (StatusCode, Json<T>);
pub type SharedAnalytics = Arc<tokio::sync::Mutex<Analytics<Box<dyn EventStorage>>>>;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub async fn run_app(app: Router, config: Config) -> Result<()> {
    let db = init_db(&config.database_url).await?;
    let analytics = init_analytics(&config);
    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create upload dir {}", config.upload_dir.display()))?;

    let address = config.bind_address;
    let app = app
        .layer(Extension(Arc::new(db)))
        .layer(Extension(analytics))
        .layer(Extension(Arc::new(config)))
        .layer(TraceLayer::new_for_http());

    tracing::info!("Server started on {}", address);
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .with_context(|| format!("Failed to create database {db_url}"))?;
    } else {
        tracing::debug!("Database already exists");
    }
    let pool = SqlitePool::connect(db_url).await?;
    tracing::debug!("Running Migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::debug!("Migrations completed");
    Ok(pool)
}

pub fn init_analytics(config: &Config) -> SharedAnalytics {
    let storage: Box<dyn EventStorage> = match &config.analytics_dir {
        Some(path) => Box::new(FileStorage::new(path)),
        None => Box::new(MemoryStorage::new()),
    };
    let analytics = Analytics::new(storage);
    let removed = analytics.cleanup();
    if removed > 0 {
        tracing::info!(removed, "pruned expired analytics events");
    }
    Arc::new(tokio::sync::Mutex::new(analytics))
}

pub fn get_random_free_port() -> Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").context("Could not bind a free port")?;
    let address = listener
        .local_addr()
        .context("Could not get a free port")?;
    Ok(address)
}

/// Lower-case, dash separated and URL safe. Letters of any script are kept.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.trim().chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

pub fn make_router() -> Router {
    Router::new()
        .route("/api/health", get(alive))
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/:id",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/:id/related", get(related_posts))
        .route("/api/public/posts/:slug", get(view_post))
        .route("/api/tags", get(list_tags))
        .route("/api/pages", get(list_pages).post(create_page))
        .route(
            "/api/pages/:id",
            get(get_page).put(update_page).delete(delete_page),
        )
        .route("/api/comments", get(list_comments).post(create_comment))
        .route(
            "/api/comments/:id",
            put(moderate_comment).delete(delete_comment),
        )
        .route(
            "/api/media",
            get(list_media)
                .post(upload_media)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/media/:id", delete(delete_media))
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/:id", delete(delete_user))
        .route("/api/analytics/events", post(track_event))
        .route("/api/analytics/stats", get(analytics_stats))
        .fallback(not_found)
}
