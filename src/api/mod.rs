//! HTTP surface.
//!
//! Thin axum router over the ingest pipeline, the snapshot store and the
//! report renderer. Every route except `/register` requires a bearer token
//! resolved by the verifier injected at startup; handlers authorize first,
//! then do one synchronous store round-trip and return.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use crate::auth::{presented_bearer_token, AuthError, Credentials, Identity, TokenVerifier, UserDirectory};
use crate::error::{ApiError, ApiResult};
use crate::ingest::{self, aggregate};
use crate::report;
use crate::store::{Snapshot, Store, RETENTION_LIMIT};

const MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub verifier: Arc<dyn TokenVerifier>,
    pub users: Arc<UserDirectory>,
}

impl AppState {
    pub fn new(store: Store, verifier: Arc<dyn TokenVerifier>) -> Self {
        Self {
            store: Arc::new(store),
            verifier,
            users: Arc::new(UserDirectory::new()),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/upload", post(upload))
        .route("/summary", get(summary))
        .route("/history", get(history))
        .route("/generate-pdf", post(generate_pdf))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}

/// Binds and runs the server on a dedicated tokio runtime.
pub fn serve(state: AppState, bind_addr: &str) -> ApiResult<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let bind_addr = bind_addr.to_string();
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
        tracing::info!(%bind_addr, "listening");
        axum::serve(listener, router(state)).await?;
        Ok(())
    })
}

/// Resolves the bearer token against the injected verifier. The token is
/// trusted to have been issued upstream; no verification beyond lookup
/// happens here.
fn authorize(headers: &HeaderMap, verifier: &dyn TokenVerifier) -> ApiResult<Identity> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = presented_bearer_token(header).ok_or(AuthError::MissingToken)?;
    Ok(verifier.verify(token)?)
}

async fn register(
    State(state): State<AppState>,
    payload: Result<Json<Credentials>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Identity>)> {
    let Json(credentials) = payload
        .map_err(|rejection| ApiError::Schema(format!("invalid register payload: {rejection}")))?;
    let identity = state.users.register(&credentials)?;
    tracing::info!(username = %identity.username, "registered identity");
    Ok((StatusCode::CREATED, Json(identity)))
}

async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<Snapshot>)> {
    let identity = authorize(&headers, state.verifier.as_ref())?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Schema(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Schema(format!("invalid multipart body: {e}")))?;
        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) = upload.ok_or_else(|| ApiError::Schema("No file provided".to_string()))?;
    if !filename.ends_with(".csv") {
        return Err(ApiError::Schema("File must be CSV".to_string()));
    }

    let records = ingest::parse_csv(&data)?;
    let aggregate = aggregate::summarize(&records);
    let snapshot = state.store.create_snapshot(&aggregate)?;

    tracing::info!(
        username = %identity.username,
        snapshot_id = snapshot.id,
        total_count = snapshot.total_count,
        "upload ingested"
    );
    Ok((StatusCode::CREATED, Json(snapshot)))
}

async fn summary(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    authorize(&headers, state.verifier.as_ref())?;

    match state.store.latest()? {
        Some(snapshot) => Ok(Json(snapshot).into_response()),
        None => Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "No data available" })),
        )
            .into_response()),
    }
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Snapshot>>> {
    authorize(&headers, state.verifier.as_ref())?;
    Ok(Json(state.store.history(RETENTION_LIMIT)?))
}

async fn generate_pdf(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    authorize(&headers, state.verifier.as_ref())?;

    let Some(snapshot) = state.store.latest()? else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "No data available to generate report" })),
        )
            .into_response());
    };

    let bytes = report::render(&snapshot)?;
    Ok(([(CONTENT_TYPE, "application/pdf")], bytes).into_response())
}
