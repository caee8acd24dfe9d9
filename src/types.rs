//! Core types for chadsvasc

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error body shared by every failing endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ExceptionMessage {
    /// Human readable description of what went wrong
    #[schema(example = "Field required: corpus")]
    pub detail: String,
}

impl ExceptionMessage {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// A single file received in a multipart request.
///
/// `name` is whatever the client sent. It is metadata only and never
/// becomes part of a storage path.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }
}

/// The two files taking part in an upload echo, in receive order
#[derive(Debug, Clone)]
pub struct UploadPair {
    pub corpus: UploadedFile,
    pub queries: UploadedFile,
}

/// Echo of both uploaded files
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct EchoResult {
    /// The name of the first file
    #[schema(example = "this_is_a_filename.txt")]
    pub filename1: String,
    /// The name of the second file
    #[schema(example = "this_is_a_filename.txt")]
    pub filename2: String,
    /// The content of the first file
    #[schema(example = "this is some content")]
    pub filecontent1: String,
    /// The content of the second file
    #[schema(example = "this is some content")]
    pub filecontent2: String,
}

/// Sidecar metadata written next to every stored upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UploadMetadata {
    pub name: String,
    pub size: usize,
    pub uploaded_at: DateTime<Utc>,
}
