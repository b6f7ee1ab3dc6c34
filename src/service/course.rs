//! Course persistence.

use crate::error::AppError;
use crate::model::{Course, CourseInput};
use crate::service::validation::{non_blank, FieldRule, RequestValidator};
use crate::store::{count_rows, tables};
use sqlx::PgPool;

const COURSE_COLUMNS: &str = "id, title, topic, release_date, author";

#[derive(Clone)]
pub struct CourseService {
    pool: PgPool,
}

/// Validated course fields ready to be written.
struct CourseRecord {
    title: String,
    topic: Option<String>,
    /// `None` keeps the stored date on update; create defaults it to today.
    release_date: Option<chrono::NaiveDate>,
    author: Option<String>,
}

impl CourseRecord {
    fn from_input(input: CourseInput) -> Result<Self, AppError> {
        let title = RequestValidator::required("title", input.title.as_deref(), FieldRule::required())?;
        Ok(CourseRecord {
            title,
            topic: non_blank(input.topic),
            release_date: input.release_date,
            author: non_blank(input.author),
        })
    }
}

impl CourseService {
    pub fn new(pool: PgPool) -> Self {
        CourseService { pool }
    }

    pub async fn list(&self) -> Result<Vec<Course>, AppError> {
        let sql = format!("SELECT {} FROM {} ORDER BY id", COURSE_COLUMNS, tables::COURSES);
        tracing::debug!(sql = %sql, "query");
        Ok(sqlx::query_as::<_, Course>(&sql).fetch_all(&self.pool).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Option<Course>, AppError> {
        let sql = format!("SELECT {} FROM {} WHERE id = $1", COURSE_COLUMNS, tables::COURSES);
        tracing::debug!(sql = %sql, id, "query");
        Ok(sqlx::query_as::<_, Course>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    pub async fn exists(&self, id: i32) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            tables::COURSES
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        Ok(count_rows(&self.pool, tables::COURSES).await?)
    }

    pub async fn create(&self, input: CourseInput) -> Result<Course, AppError> {
        let rec = CourseRecord::from_input(input)?;
        let course = sqlx::query_as::<_, Course>(&format!(
            "INSERT INTO {} (title, topic, release_date, author) VALUES ($1, $2, $3, $4) RETURNING {}",
            tables::COURSES,
            COURSE_COLUMNS
        ))
        .bind(&rec.title)
        .bind(&rec.topic)
        .bind(rec.release_date.unwrap_or_else(crate::today))
        .bind(&rec.author)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(course_id = course.id, title = %course.title, "course created");
        Ok(course)
    }

    pub async fn update(&self, id: i32, input: CourseInput) -> Result<Option<Course>, AppError> {
        let rec = CourseRecord::from_input(input)?;
        let course = sqlx::query_as::<_, Course>(&format!(
            "UPDATE {} SET title = $2, topic = $3, release_date = COALESCE($4, release_date), author = $5 WHERE id = $1 RETURNING {}",
            tables::COURSES,
            COURSE_COLUMNS
        ))
        .bind(id)
        .bind(&rec.title)
        .bind(&rec.topic)
        .bind(rec.release_date)
        .bind(&rec.author)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    /// Delete a course. Its lessons go with it (ON DELETE CASCADE).
    pub async fn delete(&self, id: i32) -> Result<bool, AppError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", tables::COURSES))
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            tracing::info!(course_id = id, "course deleted");
        }
        Ok(result.rows_affected() > 0)
    }
}
