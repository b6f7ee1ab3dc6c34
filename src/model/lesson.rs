use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const TITLE_MAX_LENGTH: usize = 200;
pub const IMAGE_PATH_MAX_LENGTH: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i32,
    pub title: String,
    pub image_path: Option<String>,
    pub introduction: String,
    pub content: Option<String>,
    pub date_created: NaiveDate,
    pub course_id: i32,
}

/// Body for creating or replacing a lesson. The image is set through the upload endpoint.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LessonInput {
    pub title: Option<String>,
    pub introduction: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    pub course_id: i32,
    /// Defaults to today when omitted.
    #[serde(default)]
    pub date_created: Option<NaiveDate>,
}
