//! Axum request handlers for all service endpoints.
//!
//! Request bodies arrive here already decrypted by the ingress filter. Every
//! document written goes through an [`EncryptedRepository`], and every
//! document returned is rendered by its serialisation hook, so responses carry
//! plaintext and the store holds envelopes.
//!
//! [`EncryptedRepository`]: crate::persistence::EncryptedRepository

use std::collections::HashMap;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use common::{
    protocol::{DocumentList, ErrorResponse, HealthResponse},
    Map, ServiceError, Value,
};
use tracing::{info, warn};

use super::state::AppState;
use crate::persistence::{Document, RepositoryError};

/// Render `err` as a JSON error response with its HTTP status.
pub fn error_response(err: ServiceError) -> Response {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    }
    (status, Json(ErrorResponse::from(&err))).into_response()
}

/// Handler error: a [`ServiceError`] rendered through [`error_response`].
#[derive(Debug)]
pub struct ApiError(ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.0)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        Self(err.into())
    }
}

type ApiResult = Result<Response, ApiError>;

/// Accept only JSON object bodies.
fn object_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> Result<Map, ServiceError> {
    let Json(json) = body.map_err(|e| ServiceError::BadRequest(e.body_text()))?;
    match Value::from(json) {
        Value::Map(map) => Ok(map),
        _ => Err(ServiceError::BadRequest("body must be a JSON object".into())),
    }
}

fn document_not_found(id: &str) -> ServiceError {
    ServiceError::NotFound(format!("document {id}"))
}

/// `GET /health`: liveness check plus the key fingerprint.
pub async fn health(State(state): State<AppState>) -> Response {
    let body = HealthResponse {
        status: "ok".into(),
        key_fingerprint: state.cipher.key_fingerprint(),
        collections: state.policies.len(),
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `POST /collections/:collection/documents`: insert a document.
pub async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult {
    let repo = state.repository(&collection)?;
    let mut doc = Document::new(object_body(body)?);
    repo.save(&mut doc).await?;
    info!(collection = %collection, id = doc.id().unwrap_or_default(), "document created");
    Ok((StatusCode::CREATED, Json(repo.to_payload(&doc))).into_response())
}

/// `GET /collections/:collection/documents`: list documents.
///
/// Query parameters are equality filters on top-level string fields.
pub async fn list(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult {
    let repo = state.repository(&collection)?;
    let filter: Map = params
        .into_iter()
        .map(|(k, v)| (k, Value::String(v)))
        .collect();
    let docs = repo.find(filter).await?;
    let payloads = docs.iter().map(|d| repo.to_payload(d)).collect();
    Ok(Json(DocumentList::new(payloads)).into_response())
}

/// `GET /collections/:collection/documents/:id`: fetch one document.
pub async fn fetch(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult {
    let repo = state.repository(&collection)?;
    let doc = repo.find_by_id(&id).await?.ok_or_else(|| document_not_found(&id))?;
    Ok(Json(repo.to_payload(&doc)).into_response())
}

/// `PATCH /collections/:collection/documents/:id`: partial update.
///
/// The body is either a flat field map or uses `$set` / `$unset`.
pub async fn update(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult {
    let repo = state.repository(&collection)?;
    let update = Value::Map(object_body(body)?);
    let doc = repo.update(&id, update).await?.ok_or_else(|| document_not_found(&id))?;
    Ok(Json(repo.to_payload(&doc)).into_response())
}

/// `DELETE /collections/:collection/documents/:id`: remove a document.
pub async fn remove(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiResult {
    let repo = state.repository(&collection)?;
    if !repo.delete(&id).await? {
        return Err(document_not_found(&id).into());
    }
    Ok(StatusCode::NO_CONTENT.into_response())
}

/// Catch-all 404 handler.
pub async fn not_found() -> impl IntoResponse {
    let err = ErrorResponse::new("not_found", "the requested resource does not exist");
    (StatusCode::NOT_FOUND, Json(err))
}
