//! Course CRUD. Reads are public; writes need the Admin role.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::model::{Course, CourseInput, Lesson};
use crate::response::{success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

fn course_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("course {}", id))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses",
    tag = "Courses",
    responses((status = 200, description = "All courses", body = SuccessMany<Course>))
)]
pub async fn list_courses(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.courses.list().await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = i32, Path, description = "Course id")),
    responses(
        (status = 200, description = "The course", body = SuccessOne<Course>),
        (status = 404, description = "No such course")
    )
)]
pub async fn get_course(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.courses.get(id).await?.ok_or_else(|| course_not_found(id))?;
    Ok(success_one_ok(course))
}

#[utoipa::path(
    get,
    path = "/api/v1/courses/{id}/lessons",
    tag = "Courses",
    params(("id" = i32, Path, description = "Course id")),
    responses(
        (status = 200, description = "Lessons of the course", body = SuccessMany<Lesson>),
        (status = 404, description = "No such course")
    )
)]
pub async fn list_course_lessons(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    if !state.courses.exists(id).await? {
        return Err(course_not_found(id));
    }
    Ok(success_many(state.lessons.list(Some(id)).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/courses",
    tag = "Courses",
    request_body = CourseInput,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Course created", body = SuccessOne<Course>),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Not an administrator"),
        (status = 422, description = "Invalid course")
    )
)]
pub async fn create_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(input): Json<CourseInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.courses.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = i32, Path, description = "Course id")),
    request_body = CourseInput,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Course replaced", body = SuccessOne<Course>),
        (status = 404, description = "No such course"),
        (status = 422, description = "Invalid course")
    )
)]
pub async fn update_course(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    Json(input): Json<CourseInput>,
) -> Result<impl IntoResponse, AppError> {
    let course = state.courses.update(id, input).await?.ok_or_else(|| course_not_found(id))?;
    Ok(success_one_ok(course))
}

#[utoipa::path(
    delete,
    path = "/api/v1/courses/{id}",
    tag = "Courses",
    params(("id" = i32, Path, description = "Course id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Course and its lessons deleted"),
        (status = 404, description = "No such course")
    )
)]
pub async fn delete_course(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    // Collect image paths first; the cascade removes the rows.
    let images: Vec<String> = state
        .lessons
        .list(Some(id))
        .await?
        .into_iter()
        .filter_map(|l| l.image_path)
        .collect();
    if !state.courses.delete(id).await? {
        return Err(course_not_found(id));
    }
    for url in images {
        super::lesson::discard_image(&state, &url).await;
    }
    tracing::info!(course_id = id, by = %admin.user_name(), "course removed");
    Ok(StatusCode::NO_CONTENT)
}
