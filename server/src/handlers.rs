#![allow(clippy::unused_async)]
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{SubsecRound, Utc};
use kernel::{
    has_pdf_suffix, ErrorReply, FileRecord, UploadReply, UploadRequest, ViewEntry,
    PDF_CONTENT_TYPE, PDF_SUFFIX,
};
use serde::de::IgnoredAny;
use serde::Deserialize;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::StoreError;
use crate::file_reply::FileReply;
use crate::AppState;

pub const UPLOADED: &str = "File uploaded successfully!";
pub const ONLY_PDF: &str = "Only PDF files are allowed.";
pub const UPLOAD_FAILED: &str = "File upload failed";
pub const LIST_FAILED: &str = "Could not retrieve files";
pub const LINK_INVALID: &str = "Link is invalid or expired";
pub const NOT_FOUND: &str = "File not found";
pub const READ_FAILED: &str = "Could not read file";

const FRONTEND: &str = include_str!("../static/index.html");
const API_URL_PLACEHOLDER: &str = "{{API_URL}}";

#[derive(Debug, Error)]
enum UploadError {
    #[error("file content is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("file content missing or not a string")]
    MissingContent,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Upload body as received. Only the name has to parse, the content is checked after the name.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadBody {
    file_name: String,
    #[serde(default)]
    file_content: Option<Content>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Content {
    Text(String),
    Other(#[allow(dead_code)] IgnoredAny),
}

#[derive(Deserialize)]
pub struct SignedQuery {
    expires: u64,
    signature: String,
}

/// Stores one PDF and records its metadata.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body = UploadRequest,
    responses(
        (status = 200, description = "File stored", body = UploadReply),
        (status = 400, description = "File name does not end with .pdf", body = ErrorReply),
        (status = 500, description = "Server error", body = ErrorReply)
    ),
)]
pub async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadBody>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(p) => p,
        Err(e) => {
            tracing::error!("Error uploading file: {e}");
            return error_reply(StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED);
        }
    };

    if !has_pdf_suffix(&request.file_name) {
        tracing::info!("file '{}' rejected: not a pdf", request.file_name);
        return error_reply(StatusCode::BAD_REQUEST, ONLY_PDF);
    }

    let start = Instant::now();
    match store_pdf(&state, request) {
        Ok(metadata) => {
            tracing::info!(
                "file: {} stored as {} record id: {} in {:?}",
                metadata.file_name,
                metadata.file_key,
                metadata.id,
                start.elapsed()
            );
            let reply = UploadReply {
                message: UPLOADED.to_owned(),
                metadata,
            };
            (StatusCode::OK, Json(reply)).into_response()
        }
        Err(e) => {
            tracing::error!("Error uploading file: {e}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, UPLOAD_FAILED)
        }
    }
}

/// Lists all stored files, each with a view URL valid for five minutes.
#[utoipa::path(
    get,
    path = "/files",
    tag = "files",
    responses(
        (status = 200, description = "All stored files", body = [ViewEntry]),
        (status = 500, description = "Server error", body = ErrorReply)
    ),
)]
pub async fn list_files(State(state): State<AppState>) -> Response {
    let start = Instant::now();
    match view_entries(&state) {
        Ok(entries) => {
            tracing::info!("listed {} files in {:?}", entries.len(), start.elapsed());
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(e) => {
            tracing::error!("Error fetching files: {e}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, LIST_FAILED)
        }
    }
}

/// Serves file content behind a signed URL.
#[utoipa::path(
    get,
    path = "/objects/{key}",
    tag = "files",
    responses(
        (status = 200, description = "File content"),
        (status = 403, description = "Link is invalid or expired", body = ErrorReply),
        (status = 404, description = "File not found", body = ErrorReply),
        (status = 500, description = "Server error", body = ErrorReply)
    ),
    params(
        ("key" = String, Path, description = "Object key"),
        ("expires" = u64, Query, description = "Expiry as unix time in seconds"),
        ("signature" = String, Query, description = "Hex encoded signature")
    ),
)]
pub async fn get_object(
    Path(key): Path<String>,
    State(state): State<AppState>,
    query: Result<Query<SignedQuery>, QueryRejection>,
) -> Response {
    let Ok(Query(query)) = query else {
        tracing::info!("object {key} requested without signature");
        return error_reply(StatusCode::FORBIDDEN, LINK_INVALID);
    };

    if let Err(e) = state.signer.verify(&key, query.expires, &query.signature) {
        tracing::info!("object {key} refused: {e}");
        return error_reply(StatusCode::FORBIDDEN, LINK_INVALID);
    }

    match state.objects.get_object(&key) {
        Ok(object) => {
            tracing::info!("object {key} size {}", object.data.len());
            FileReply::new(key, object).into_response()
        }
        Err(StoreError::NotFound(_)) => error_reply(StatusCode::NOT_FOUND, NOT_FOUND),
        Err(e) => {
            tracing::error!("Error reading object {key}: {e}");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, READ_FAILED)
        }
    }
}

/// Browser frontend.
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(FRONTEND.replace(API_URL_PLACEHOLDER, &escape_attribute(&state.api_url)))
}

fn store_pdf(state: &AppState, request: UploadBody) -> Result<FileRecord, UploadError> {
    let Some(Content::Text(content)) = request.file_content else {
        return Err(UploadError::MissingContent);
    };
    let data = STANDARD.decode(content.as_bytes())?;

    let file_key = format!("{}{PDF_SUFFIX}", Uuid::new_v4());
    state.objects.put_object(&file_key, PDF_CONTENT_TYPE, &data)?;
    tracing::debug!("object {file_key} written, {} bytes", data.len());

    // A failure below leaves the object without metadata
    let record = FileRecord {
        id: Uuid::new_v4().to_string(),
        file_name: request.file_name,
        file_key,
        upload_date: Utc::now().trunc_subsecs(3),
    };
    state.metadata.put_record(&record)?;

    Ok(record)
}

fn view_entries(state: &AppState) -> Result<Vec<ViewEntry>, StoreError> {
    let records = state.metadata.scan()?;
    records
        .into_iter()
        .map(|record| {
            let view_url = state
                .objects
                .presign_read(&record.file_key, state.view_url_ttl)?;
            Ok(ViewEntry { record, view_url })
        })
        .collect()
}

fn error_reply(status: StatusCode, message: &str) -> Response {
    (status, Json(ErrorReply::new(message))).into_response()
}

/// Escapes a value for a double quoted attribute. Used for the `api-url` meta tag only.
fn escape_attribute(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
