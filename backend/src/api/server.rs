//! HTTP server for the campaign import API.
//!
//! # API Endpoints
//!
//! | Method | Path                              | Description                     |
//! |--------|-----------------------------------|---------------------------------|
//! | GET    | `/health`                         | Health check                    |
//! | POST   | `/api/import`                     | Upload a CSV/TSV file or zip    |
//! | GET    | `/api/imports`                    | Import history, newest first    |
//! | GET    | `/api/imports/{id}`               | One import record               |
//! | GET    | `/api/campaigns`                  | Campaigns with subtree sizes    |
//! | GET    | `/api/campaigns/{id}/snapshots`   | Snapshots of one campaign       |
//! | GET    | `/api/snapshots/{id}`             | One snapshot with its data      |
//! | GET    | `/api/logs`                       | SSE stream for real-time logs   |
//!
//! SQLite work is blocking, so every handler hops onto `spawn_blocking` and
//! locks the shared store there.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, Method, StatusCode},
    response::{sse::Event, Json, Sse},
    routing::{get, post},
    Router,
};
use futures::stream::{self, Stream};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::{convert::Infallible, net::SocketAddr, time::Duration};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt as _;
use tower_http::cors::CorsLayer;

use super::logs::{log_info, LOG_BROADCASTER};
use super::types::{error_response, parse_flag, ApiError, CampaignSummary, SnapshotSummary};
use crate::error::{ServerError, ServerResult, StoreError};
use crate::import::{import_upload, ImportOptions, ImportResult};
use crate::models::{ImportRecord, Snapshot};
use crate::store::{Repository, Store};

/// Store shared by all handlers.
pub type SharedStore = Arc<Mutex<Store>>;

pub fn router(store: SharedStore) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(health))
        .route("/health", get(health))
        .route("/api/import", post(upload_import))
        .route("/api/imports", get(list_imports))
        .route("/api/imports/{id}", get(get_import))
        .route("/api/campaigns", get(list_campaigns))
        .route("/api/campaigns/{id}/snapshots", get(campaign_snapshots))
        .route("/api/snapshots/{id}", get(get_snapshot))
        .route("/api/logs", get(sse_logs))
        .layer(cors)
        .with_state(store)
}

/// Start the HTTP server
pub async fn start_server(store: Store, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = router(Arc::new(Mutex::new(store)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    println!("🚀 Campaign import server running on http://localhost:{}", port);
    println!("   POST /api/import    - Upload export file or zip bundle");
    println!("   GET  /api/imports   - Import history");
    println!("   GET  /api/campaigns - Campaigns");
    println!("   GET  /api/logs      - SSE log stream");
    println!();

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Run `work` against the locked store on the blocking pool.
async fn with_store<T, F>(store: SharedStore, work: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut Store) -> ServerResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = store
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))?;
        work(&mut *guard)
    })
    .await
    .map_err(|e| ServerError::Internal(format!("blocking task failed: {}", e)))?
}

fn read_only<T, F>(f: F) -> impl FnOnce(&mut Store) -> ServerResult<T>
where
    F: FnOnce(&Repository<'_>) -> Result<T, StoreError>,
{
    move |store: &mut Store| Ok(f(&store.repository())?)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "campaign-import",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "import": "POST /api/import",
            "imports": "GET /api/imports",
            "campaigns": "GET /api/campaigns",
            "logs": "GET /api/logs (SSE)"
        }
    }))
}

/// SSE endpoint: replays recent entries, then streams live ones.
async fn sse_logs() -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = LOG_BROADCASTER.subscribe();
    let backlog = LOG_BROADCASTER.recent();

    let live = BroadcastStream::new(rx).filter_map(|result| result.ok());
    let stream = stream::iter(backlog)
        .chain(live)
        .filter_map(|entry| {
            let json = serde_json::to_string(&entry).ok()?;
            Some(Ok(Event::default().data(json)))
        });

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Multipart upload: `file` plus optional `updateExisting` / `createSnapshot`.
async fn upload_import(
    State(store): State<SharedStore>,
    mut multipart: Multipart,
) -> Result<Json<ImportResult>, ApiError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut options = ImportOptions::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (StatusCode::BAD_REQUEST, Json(error_response(&format!("Multipart error: {}", e))))
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            (StatusCode::BAD_REQUEST, Json(error_response(&format!("Read error: {}", e))))
                        })?
                        .to_vec(),
                );
            }
            "updateExisting" | "createSnapshot" => {
                let raw = field.text().await.unwrap_or_default();
                let flag = parse_flag(&raw).ok_or_else(|| {
                    ApiError::from(ServerError::BadRequest(format!("{} must be a boolean, got '{}'", name, raw)))
                })?;
                if name == "updateExisting" {
                    options.update_existing = flag;
                } else {
                    options.create_snapshot = flag;
                }
            }
            _ => {}
        }
    }

    let bytes = file_data.ok_or_else(|| ApiError::from(ServerError::BadRequest("No file provided".to_string())))?;
    let file_name = file_name.unwrap_or_else(|| "upload".to_string());

    println!("\n{}", "=".repeat(70));
    println!("📄 NEW IMPORT: {} ({} bytes)", file_name, bytes.len());
    println!("{}\n", "=".repeat(70));
    log_info(format!("Received '{}' ({} bytes)", file_name, bytes.len()));

    let result = with_store(store, move |store| {
        Ok(import_upload(store, &file_name, &bytes, &options))
    })
    .await?;

    Ok(Json(result))
}

async fn list_imports(State(store): State<SharedStore>) -> Result<Json<Vec<ImportRecord>>, ApiError> {
    let records = with_store(store, read_only(|repo| repo.list_import_records())).await?;
    Ok(Json(records))
}

async fn get_import(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<ImportRecord>, ApiError> {
    let record = with_store(
        store,
        read_only(move |repo| {
            repo.get_import_record(&id)?
                .ok_or_else(|| StoreError::not_found("Import record", id.as_str()))
        }),
    )
    .await?;
    Ok(Json(record))
}

async fn list_campaigns(State(store): State<SharedStore>) -> Result<Json<Vec<CampaignSummary>>, ApiError> {
    let summaries = with_store(
        store,
        read_only(|repo| {
            let mut summaries = Vec::new();
            for campaign in repo.list_campaigns()? {
                if let Some(tree) = repo.load_subtree(&campaign.id)? {
                    summaries.push(CampaignSummary::from(tree));
                }
            }
            Ok(summaries)
        }),
    )
    .await?;
    Ok(Json(summaries))
}

async fn campaign_snapshots(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Vec<SnapshotSummary>>, ApiError> {
    let snapshots = with_store(
        store,
        read_only(move |repo| {
            repo.get_campaign(&id)?
                .ok_or_else(|| StoreError::not_found("Campaign", id.as_str()))?;
            crate::import::list_snapshots(repo, &id)
        }),
    )
    .await?;
    Ok(Json(snapshots.iter().map(SnapshotSummary::from).collect()))
}

async fn get_snapshot(
    State(store): State<SharedStore>,
    Path(id): Path<String>,
) -> Result<Json<Snapshot>, ApiError> {
    let snapshot = with_store(store, read_only(move |repo| crate::import::get_snapshot(repo, &id))).await?;
    Ok(Json(snapshot))
}
