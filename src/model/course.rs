use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i32,
    pub title: String,
    pub topic: Option<String>,
    pub release_date: NaiveDate,
    pub author: Option<String>,
}

/// Body for creating or replacing a course.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    /// Defaults to today when omitted.
    #[serde(default)]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub author: Option<String>,
}
