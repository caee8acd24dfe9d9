//! OpenAPI document
//!
//! The score routes live under a prefix chosen at runtime, so their paths
//! are rewritten before being merged into the root document.

use utoipa::openapi::OpenApi as OpenApiDoc;
use utoipa::OpenApi;

use crate::api::handlers;
use crate::config::AppSection;
use crate::score::{Cha2ds2VascRequest, Cha2ds2VascResponse, RiskCategory, Sex};
use crate::types::{EchoResult, ExceptionMessage};

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::ready, handlers::test_upload),
    components(schemas(
        handlers::HealthResponse,
        handlers::ReadinessResponse,
        EchoResult,
        ExceptionMessage
    )),
    tags(
        (name = "Diagnostics", description = "Liveness and readiness"),
        (name = "Files", description = "Upload round-trip testing")
    )
)]
struct RootDoc;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::cha2ds2_vasc),
    components(schemas(
        Cha2ds2VascRequest,
        Cha2ds2VascResponse,
        RiskCategory,
        Sex,
        ExceptionMessage
    )),
    tags((name = "CHA₂DS₂-VASc", description = "Stroke risk scoring for atrial fibrillation"))
)]
struct ScoreDoc;

/// Build the document served at `app.openapi_url`
pub fn build(app: &AppSection) -> OpenApiDoc {
    let mut doc = RootDoc::openapi();

    let mut score = ScoreDoc::openapi();
    score.paths.paths = std::mem::take(&mut score.paths.paths)
        .into_iter()
        .map(|(path, item)| (format!("{}{}", app.api_prefix, path), item))
        .collect();
    doc.merge(score);

    doc.info.title = app.title.clone();
    doc.info.description = Some(app.description.clone());
    doc.info.version = app.version.clone();

    doc
}
