//! chadsvasc - CHA₂DS₂-VASc scoring API
//!
//! Serves three surfaces from one axum router:
//! - Diagnostics (`/health`, `/ready`)
//! - CHA₂DS₂-VASc score calculation under a configurable prefix
//! - `POST /test_upload/`, a two-file upload round trip used for manual testing

pub mod api;
pub mod config;
pub mod error;
pub mod score;
pub mod storage;
pub mod types;
pub mod upload;

pub use error::{Error, Result};
