use anyhow::{Context, Result};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::{io::ErrorKind, path::Path, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use services::{
    lifecycle_service::{LifecycleService, VideoLifecycle},
    object_storage::{ObjectStorage, S3ObjectStorage, S3Settings},
    stream_service::StreamService,
    upload_service::UploadService,
    video_store::VideoStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting vidshare on {} (bucket `{}`, s3 endpoint {})",
        cfg.addr(),
        cfg.bucket,
        cfg.s3_endpoint
    );

    // --- Initialize SQLite connection ---
    let db_url = &cfg.database_url;
    tracing::debug!("Connecting using raw URL => {}", db_url);

    // Create parent directory of a file-backed database if needed
    let db_path = db_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    if !db_path.starts_with(":memory:") {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating database directory {:?}", parent))?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
    }

    let connect_opts = SqliteConnectOptions::from_str(db_url)
        .with_context(|| format!("parsing database URL `{}`", db_url))?
        .create_if_missing(true);
    let db = Arc::new(
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await?,
    );

    // --- Schema + search index repair ---
    let store = VideoStore::new(db.clone());
    store.run_migrations().await?;
    let report = store.sync_search_index().await?;
    if report.inserted > 0 || report.removed > 0 {
        tracing::warn!(
            "Search index repaired: {} entries added, {} orphans removed",
            report.inserted,
            report.removed
        );
    }

    // --- Handle migration mode ---
    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Initialize services ---
    let storage: Arc<dyn ObjectStorage> = Arc::new(S3ObjectStorage::new(
        S3Settings {
            endpoint: cfg.s3_endpoint.clone(),
            region: cfg.s3_region.clone(),
            access_key: cfg.s3_access_key.clone(),
            secret_key: cfg.s3_secret_key.clone(),
        },
        &cfg.bucket,
    )?);
    let lifecycle: Arc<dyn VideoLifecycle> = Arc::new(LifecycleService::new(store.clone()));

    let state = state::AppState {
        store,
        lifecycle: lifecycle.clone(),
        uploads: UploadService::new(lifecycle.clone(), storage.clone(), cfg.bucket.clone()),
        streams: StreamService::new(lifecycle, storage, cfg.bucket.clone()),
    };

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.request_timeout).with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
