use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use kernel::{ErrorReply, FileRecord, UploadReply, UploadRequest, ViewEntry};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    classify::ServerErrorsFailureClass,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod domain;
pub mod file_reply;
pub mod handlers;
pub mod signing;
pub mod sqlite;

#[cfg(test)] // <-- not needed in integration tests
extern crate rstest;

use crate::config::{Config, ConfigError};
use crate::domain::{MetadataStore, ObjectStore, StoreError};
use crate::signing::{UrlSigner, OBJECTS_PATH};
use crate::sqlite::{MetadataTable, Mode, ObjectBucket, Sqlite};

/// Lifetime of the view URLs handed out by the listing.
pub const VIEW_URL_TTL: Duration = Duration::from_secs(5 * 60);

pub const BODY_LIMIT: usize = 64 * 1024 * 1024; /* 64MB */

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Store handles and settings shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub objects: Arc<dyn ObjectStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub signer: UrlSigner,
    pub view_url_ttl: Duration,
    /// API base URL announced to the browser frontend
    pub api_url: String,
}

impl AppState {
    #[must_use]
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        metadata: Arc<dyn MetadataStore>,
        signer: UrlSigner,
        api_url: &str,
    ) -> Self {
        Self {
            objects,
            metadata,
            signer,
            view_url_ttl: VIEW_URL_TTL,
            api_url: api_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Opens (creating when needed) the SQLite backed stores described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, StoreError> {
        Sqlite::open(&config.db, Mode::ReadWrite)?.new_database(&config.bucket, &config.table)?;

        let signer = UrlSigner::new(&config.signing_secret, &config.public_url);
        let objects = ObjectBucket::new(config.db.clone(), &config.bucket, signer.clone());
        let metadata = MetadataTable::new(config.db.clone(), &config.table);

        Ok(Self::new(
            Arc::new(objects),
            Arc::new(metadata),
            signer,
            &config.public_url,
        ))
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(handlers::upload, handlers::list_files, handlers::get_object),
    components(schemas(FileRecord, ViewEntry, UploadRequest, UploadReply, ErrorReply)),
    tags((name = "files", description = "PDF upload and viewing API"))
)]
struct ApiDoc;

pub async fn run() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "server=debug,pdfview=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;
    tracing::debug!(
        "bucket: {} table: {} database: {}",
        config.bucket,
        config.table,
        config.db.display()
    );

    let socket = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(socket).await?;
    tracing::debug!("listening on {socket}");

    serve(listener, state, shutdown_signal()).await
}

/// Serves the API on `listener` until `shutdown` completes.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, create_routes(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub fn create_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(handlers::index))
        .route("/upload", post(handlers::upload))
        .route("/files", get(handlers::list_files))
        .route(&format!("/{OBJECTS_PATH}/:key"), get(handlers::get_object))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().on_failure(
                    |error: ServerErrorsFailureClass, _latency: Duration, _span: &Span| {
                        tracing::error!("Server error: {error}");
                    },
                ))
                .layer(cors)
                // oversized uploads surface as a JSON rejection in the handler
                .layer(DefaultBodyLimit::max(BODY_LIMIT))
                .into_inner(),
        )
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("signal received, starting graceful shutdown");
}
