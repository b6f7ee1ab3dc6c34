//! Conventional MVC-style paths for the home pages.

use crate::handlers::home::{error_page, index, privacy};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn home_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/Home", get(index))
        .route("/Home/Index", get(index))
        .route("/Home/Privacy", get(privacy))
        .route("/Home/Error", get(error_page))
        .with_state(state)
}
