//! Landing, privacy and error pages.

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSummary {
    pub name: String,
    pub version: String,
    pub courses: i64,
    pub lessons: i64,
    pub docs: String,
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Home",
    responses((status = 200, description = "Catalog summary", body = CatalogSummary))
)]
pub async fn index(State(state): State<AppState>) -> Result<Json<CatalogSummary>, AppError> {
    Ok(Json(CatalogSummary {
        name: "Course Catalog".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        courses: state.courses.count().await?,
        lessons: state.lessons.count().await?,
        docs: crate::routes::docs::SWAGGER_UI_PATH.to_string(),
    }))
}

pub async fn privacy() -> Html<&'static str> {
    Html(
        "<!DOCTYPE html><html><head><title>Privacy Policy</title></head>\
         <body><h1>Privacy Policy</h1><p>Use this page to detail your site's privacy policy.</p></body></html>",
    )
}

/// Target of the production panic redirect.
pub async fn error_page() -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Html(
            "<!DOCTYPE html><html><head><title>Error</title></head>\
             <body><h1>Error.</h1><h2>An error occurred while processing your request.</h2></body></html>",
        ),
    )
}
