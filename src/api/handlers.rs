//! API handlers

use axum::{
    extract::{
        multipart::{Multipart, MultipartRejection},
        rejection::JsonRejection,
        State,
    },
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::AppState;
use crate::score::{self, Cha2ds2VascRequest, Cha2ds2VascResponse};
use crate::types::{EchoResult, ExceptionMessage, UploadPair, UploadedFile};
use crate::{Error, Result};

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "Diagnostics",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse),
        (status = 400, description = "Bad request", body = ExceptionMessage),
        (status = 401, description = "Unauthorized", body = ExceptionMessage),
        (status = 403, description = "Forbidden", body = ExceptionMessage),
        (status = 404, description = "Not found", body = ExceptionMessage),
        (status = 422, description = "Unprocessable request", body = ExceptionMessage)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        node_id: state.node_id().to_string(),
        timestamp: Utc::now(),
    })
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub node_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Readiness check against the storage backend
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Diagnostics",
    responses(
        (status = 200, description = "Service can accept uploads", body = ReadinessResponse),
        (status = 400, description = "Bad request", body = ExceptionMessage),
        (status = 401, description = "Unauthorized", body = ExceptionMessage),
        (status = 403, description = "Forbidden", body = ExceptionMessage),
        (status = 404, description = "Not found", body = ExceptionMessage),
        (status = 422, description = "Unprocessable request", body = ExceptionMessage),
        (status = 503, description = "Storage is unavailable", body = ExceptionMessage)
    )
)]
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadinessResponse>> {
    let stored_uploads = state
        .echo
        .stored_count()
        .await
        .map_err(|e| Error::StorageUnavailable(e.to_string()))?;

    Ok(Json(ReadinessResponse {
        status: "ready".to_string(),
        storage_root: state.storage.location(),
        stored_uploads,
    }))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub status: String,
    pub storage_root: String,
    pub stored_uploads: usize,
}

/// Calculate the CHA₂DS₂-VASc score
#[utoipa::path(
    post,
    path = "/cha2ds2-vasc",
    tag = "CHA₂DS₂-VASc",
    request_body = Cha2ds2VascRequest,
    responses(
        (status = 200, description = "Calculated score", body = Cha2ds2VascResponse),
        (status = 400, description = "Malformed request", body = ExceptionMessage),
        (status = 401, description = "Unauthorized", body = ExceptionMessage),
        (status = 403, description = "Forbidden", body = ExceptionMessage),
        (status = 404, description = "Not found", body = ExceptionMessage),
        (status = 422, description = "Invalid field values", body = ExceptionMessage)
    )
)]
pub async fn cha2ds2_vasc(
    payload: std::result::Result<Json<Cha2ds2VascRequest>, JsonRejection>,
) -> Result<Json<Cha2ds2VascResponse>> {
    let Json(request) = payload?;
    let response = score::calculate(&request)?;

    tracing::debug!(
        score = response.score,
        risk = ?response.risk_category,
        "Calculated CHA2DS2-VASc score"
    );

    Ok(Json(response))
}

/// Testing file uploads.
///
/// Stores both files, reads them back as UTF-8 and echoes names and contents.
#[utoipa::path(
    post,
    path = "/test_upload/",
    tag = "Files",
    summary = "Files",
    request_body(
        content_type = "multipart/form-data",
        description = "Two file parts named `corpus` and `queries`"
    ),
    responses(
        (status = 200, description = "Echo of both files", body = EchoResult),
        (status = 400, description = "Malformed multipart body", body = ExceptionMessage),
        (status = 401, description = "Unauthorized", body = ExceptionMessage),
        (status = 403, description = "Forbidden", body = ExceptionMessage),
        (status = 404, description = "Not found", body = ExceptionMessage),
        (status = 413, description = "Payload too large", body = ExceptionMessage),
        (status = 422, description = "Missing part or non-UTF-8 content", body = ExceptionMessage),
        (status = 504, description = "Storage timed out", body = ExceptionMessage)
    )
)]
pub async fn test_upload(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<EchoResult>> {
    let pair = read_upload_pair(multipart?).await?;
    let result = state.echo.echo(pair).await?;
    Ok(Json(result))
}

/// Serve the OpenAPI document
pub async fn openapi_json(State(state): State<AppState>) -> Json<utoipa::openapi::OpenApi> {
    Json(state.openapi.as_ref().clone())
}

/// Collect exactly one `corpus` and one `queries` file part
async fn read_upload_pair(mut multipart: Multipart) -> Result<UploadPair> {
    let mut corpus: Option<UploadedFile> = None;
    let mut queries: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let field_name = field.name().unwrap_or("").to_string();

        let slot = match field_name.as_str() {
            "corpus" => &mut corpus,
            "queries" => &mut queries,
            other => {
                return Err(Error::validation(format!("Unexpected field: {}", other)));
            }
        };

        if slot.is_some() {
            return Err(Error::validation(format!(
                "Field '{}' must contain exactly one file",
                field_name
            )));
        }

        let name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(Error::validation(format!(
                    "Field '{}' must be a file upload",
                    field_name
                )));
            }
        };

        let bytes = field.bytes().await?;
        *slot = Some(UploadedFile { name, bytes });
    }

    match (corpus, queries) {
        (Some(corpus), Some(queries)) => Ok(UploadPair { corpus, queries }),
        (None, _) => Err(Error::validation("Field required: corpus")),
        (_, None) => Err(Error::validation("Field required: queries")),
    }
}
