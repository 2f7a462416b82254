//! Vault creation session endpoints
//!
//! Every handler returns the session snapshot after the operation so the
//! presentation layer never has to reconcile partial state.

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::StatusCode,
    routing::{delete, post, put},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::models::{CandidateFile, DetailField, Session, MINT_ERROR_KEY, VERIFICATION_ERROR_KEY};
use crate::workflow::WorkflowEngine;
use crate::{ApiError, ApiResult, AppState};

/// Request body ceiling for evidence uploads (base64 inflates content by 4/3)
pub const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// PUT /vaults/sessions/{id}/details request
#[derive(Debug, Deserialize)]
pub struct UpdateDetailsRequest {
    pub field: DetailField,
    pub value: String,
}

/// One evidence file in an upload request
#[derive(Debug, Deserialize)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    /// Base64 (standard alphabet) file content
    pub content: String,
}

/// POST /vaults/sessions/{id}/files request
#[derive(Debug, Deserialize)]
pub struct AddFilesRequest {
    pub files: Vec<UploadFile>,
}

/// PUT /vaults/sessions/{id}/wallet request
#[derive(Debug, Deserialize)]
pub struct ConnectWalletRequest {
    pub address: String,
}

/// Snapshot envelope
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session: Session,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        Self { session }
    }
}

async fn lookup(state: &AppState, session_id: Uuid) -> ApiResult<Arc<WorkflowEngine>> {
    state
        .sessions
        .read()
        .await
        .get(&session_id)
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("Session {}", session_id)))
}

/// POST /vaults/sessions
pub async fn create_session(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    state.evict_idle_sessions().await;

    let engine = Arc::new(state.new_engine());
    let session_id = engine.session_id();
    let snapshot = engine.snapshot().await;

    state.sessions.write().await.insert(session_id, engine);
    info!(session_id = %session_id, "Vault creation session started");

    Ok((StatusCode::CREATED, Json(snapshot.into())))
}

/// GET /vaults/sessions/{id}
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    Ok(Json(engine.snapshot().await.into()))
}

/// DELETE /vaults/sessions/{id}
///
/// Abandons the session. An in-flight verification or mint keeps running in
/// its own task and records into the dropped session, so the outcome is no
/// longer reachable.
pub async fn abandon_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state
        .sessions
        .write()
        .await
        .remove(&session_id)
        .ok_or_else(|| ApiError::NotFound(format!("Session {}", session_id)))?;

    info!(session_id = %session_id, "Vault creation session abandoned");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /vaults/sessions/{id}/details
pub async fn update_details(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<UpdateDetailsRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.update_details(request.field, request.value).await?;
    Ok(Json(session.into()))
}

/// POST /vaults/sessions/{id}/files
pub async fn add_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AddFilesRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;

    let candidates = request
        .files
        .into_iter()
        .map(|file| -> ApiResult<CandidateFile> {
            let content = BASE64
                .decode(file.content.as_bytes())
                .map_err(|e| ApiError::BadRequest(format!("File {}: invalid base64 content: {}", file.name, e)))?;
            Ok(CandidateFile::new(file.name, file.mime_type, content))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let session = engine.add_files(candidates).await?;
    Ok(Json(session.into()))
}

/// DELETE /vaults/sessions/{id}/files/{index}
pub async fn remove_file(
    State(state): State<AppState>,
    Path((session_id, index)): Path<(Uuid, usize)>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.remove_file(index).await?;
    Ok(Json(session.into()))
}

/// PUT /vaults/sessions/{id}/wallet
pub async fn connect_wallet(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<ConnectWalletRequest>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.connect_wallet(&request.address).await?;
    Ok(Json(session.into()))
}

/// DELETE /vaults/sessions/{id}/wallet
pub async fn disconnect_wallet(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.disconnect_wallet().await?;
    Ok(Json(session.into()))
}

/// POST /vaults/sessions/{id}/next
pub async fn next(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    Ok(Json(engine.next().await?.into()))
}

/// POST /vaults/sessions/{id}/back
pub async fn back(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    Ok(Json(engine.back().await?.into()))
}

/// POST /vaults/sessions/{id}/verify
///
/// Resolves once every evidence file has been verified. A concurrent request
/// for the same session gets 409.
pub async fn verify(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.verify().await?;
    state.record_failure(&session, VERIFICATION_ERROR_KEY).await;
    Ok(Json(session.into()))
}

/// POST /vaults/sessions/{id}/mint
pub async fn mint(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    let session = engine.mint().await?;
    state.record_failure(&session, MINT_ERROR_KEY).await;
    Ok(Json(session.into()))
}

/// POST /vaults/sessions/{id}/reset
pub async fn reset(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionResponse>> {
    let engine = lookup(&state, session_id).await?;
    Ok(Json(engine.reset().await?.into()))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/vaults/sessions", post(create_session))
        .route(
            "/vaults/sessions/:id",
            axum::routing::get(get_session).delete(abandon_session),
        )
        .route("/vaults/sessions/:id/details", put(update_details))
        .route(
            "/vaults/sessions/:id/files",
            post(add_files).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/vaults/sessions/:id/files/:index", delete(remove_file))
        .route(
            "/vaults/sessions/:id/wallet",
            put(connect_wallet).delete(disconnect_wallet),
        )
        .route("/vaults/sessions/:id/next", post(next))
        .route("/vaults/sessions/:id/back", post(back))
        .route("/vaults/sessions/:id/verify", post(verify))
        .route("/vaults/sessions/:id/mint", post(mint))
        .route("/vaults/sessions/:id/reset", post(reset))
}
