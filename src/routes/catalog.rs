//! Catalog and account API, mounted under `/api/v1`.

use crate::handlers::{account, course, lesson};
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::limit::RequestBodyLimitLayer;

pub fn catalog_routes(state: AppState) -> Router {
    let upload_limit = state.max_upload_bytes;
    let uploads = Router::new()
        .route(
            "/lessons/:id/image",
            post(lesson::upload_lesson_image).get(lesson::get_lesson_image),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(upload_limit));

    Router::new()
        .route("/courses", get(course::list_courses).post(course::create_course))
        .route(
            "/courses/:id",
            get(course::get_course)
                .put(course::update_course)
                .delete(course::delete_course),
        )
        .route("/courses/:id/lessons", get(course::list_course_lessons))
        .route("/lessons", get(lesson::list_lessons).post(lesson::create_lesson))
        .route(
            "/lessons/:id",
            get(lesson::get_lesson)
                .put(lesson::update_lesson)
                .delete(lesson::delete_lesson),
        )
        .merge(uploads)
        .route("/account/register", post(account::register))
        .route("/account/login", post(account::login))
        .route("/account/logout", post(account::logout))
        .route("/account/me", get(account::me))
        .with_state(state)
}
