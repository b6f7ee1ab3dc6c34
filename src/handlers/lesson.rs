//! Lesson CRUD and image upload.

use crate::error::AppError;
use crate::extractors::AdminUser;
use crate::model::{Lesson, LessonInput};
use crate::response::{success_many, success_one, success_one_ok, SuccessMany, SuccessOne};
use crate::state::AppState;
use crate::storage::unique_file_name;
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

pub const IMAGE_FIELD: &str = "file";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct LessonQuery {
    /// Only lessons of this course.
    pub course_id: Option<i32>,
}

/// Multipart body of the image upload.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct LessonImageUpload {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
}

fn lesson_not_found(id: i32) -> AppError {
    AppError::NotFound(format!("lesson {}", id))
}

/// Content type served for a stored image, from its extension.
pub fn image_content_type(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Remove a stored image. Failures are logged; the lesson change has already happened.
pub(crate) async fn discard_image(state: &AppState, url: &str) {
    let Some(name) = state.storage.file_name_from_url(url) else {
        return;
    };
    if let Err(e) = state.storage.delete_file(&name).await {
        tracing::warn!(error = %e, file = %name, "could not delete lesson image");
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons",
    tag = "Lessons",
    params(LessonQuery),
    responses((status = 200, description = "Lessons", body = SuccessMany<Lesson>))
)]
pub async fn list_lessons(
    State(state): State<AppState>,
    Query(q): Query<LessonQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_many(state.lessons.list(q.course_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}",
    tag = "Lessons",
    params(("id" = i32, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "The lesson", body = SuccessOne<Lesson>),
        (status = 404, description = "No such lesson")
    )
)]
pub async fn get_lesson(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = state.lessons.get(id).await?.ok_or_else(|| lesson_not_found(id))?;
    Ok(success_one_ok(lesson))
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons",
    tag = "Lessons",
    request_body = LessonInput,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Lesson created", body = SuccessOne<Lesson>),
        (status = 422, description = "Invalid lesson or unknown course")
    )
)]
pub async fn create_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(input): Json<LessonInput>,
) -> Result<impl IntoResponse, AppError> {
    Ok(success_one(state.lessons.create(input).await?))
}

#[utoipa::path(
    put,
    path = "/api/v1/lessons/{id}",
    tag = "Lessons",
    params(("id" = i32, Path, description = "Lesson id")),
    request_body = LessonInput,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Lesson replaced", body = SuccessOne<Lesson>),
        (status = 404, description = "No such lesson"),
        (status = 422, description = "Invalid lesson or unknown course")
    )
)]
pub async fn update_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    Json(input): Json<LessonInput>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = state.lessons.update(id, input).await?.ok_or_else(|| lesson_not_found(id))?;
    Ok(success_one_ok(lesson))
}

#[utoipa::path(
    delete,
    path = "/api/v1/lessons/{id}",
    tag = "Lessons",
    params(("id" = i32, Path, description = "Lesson id")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Lesson deleted"),
        (status = 404, description = "No such lesson")
    )
)]
pub async fn delete_lesson(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let lesson = state.lessons.delete(id).await?.ok_or_else(|| lesson_not_found(id))?;
    if let Some(url) = lesson.image_path {
        discard_image(&state, &url).await;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/lessons/{id}/image",
    tag = "Lessons",
    params(("id" = i32, Path, description = "Lesson id")),
    request_body(content = LessonImageUpload, content_type = "multipart/form-data"),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Image stored", body = SuccessOne<Lesson>),
        (status = 400, description = "Missing or non-image file"),
        (status = 404, description = "No such lesson")
    )
)]
pub async fn upload_lesson_image(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    if state.lessons.get(id).await?.is_none() {
        return Err(lesson_not_found(id));
    }
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        if !content_type.starts_with("image/") {
            return Err(AppError::BadRequest(format!("expected an image, got '{}'", content_type)));
        }
        let file_name = unique_file_name(field.file_name());
        let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some((file_name, bytes));
        break;
    }
    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest(format!("multipart field '{}' is required", IMAGE_FIELD)))?;
    if bytes.is_empty() {
        return Err(AppError::BadRequest("uploaded file is empty".into()));
    }

    state.storage.save_file(&bytes, &file_name).await?;
    let url = state.storage.file_url(&file_name);
    let Some((lesson, previous)) = state.lessons.set_image(id, &url).await? else {
        // Deleted while uploading.
        discard_image(&state, &url).await;
        return Err(lesson_not_found(id));
    };
    if let Some(previous) = previous.filter(|p| p != &url) {
        discard_image(&state, &previous).await;
    }
    tracing::info!(lesson_id = id, file = %file_name, size = bytes.len(), "lesson image stored");
    Ok(success_one_ok(lesson))
}

#[utoipa::path(
    get,
    path = "/api/v1/lessons/{id}/image",
    tag = "Lessons",
    params(("id" = i32, Path, description = "Lesson id")),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "No such lesson or no image")
    )
)]
pub async fn get_lesson_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let lesson = state.lessons.get(id).await?.ok_or_else(|| lesson_not_found(id))?;
    let name = lesson
        .image_path
        .as_deref()
        .and_then(|url| state.storage.file_name_from_url(url))
        .ok_or_else(|| AppError::NotFound(format!("image of lesson {}", id)))?;
    let bytes = state.storage.load_file(&name).await?;
    Ok(([(header::CONTENT_TYPE, image_content_type(&name))], bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(image_content_type("a.PNG"), "image/png");
        assert_eq!(image_content_type("a.jpeg"), "image/jpeg");
        assert_eq!(image_content_type("a"), "application/octet-stream");
    }
}
