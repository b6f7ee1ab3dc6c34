//! Lesson persistence.

use crate::error::AppError;
use crate::model::lesson::{IMAGE_PATH_MAX_LENGTH, TITLE_MAX_LENGTH};
use crate::model::{Lesson, LessonInput};
use crate::service::validation::{non_blank, FieldRule, RequestValidator};
use crate::store::{count_rows, tables};
use sqlx::PgPool;

const LESSON_COLUMNS: &str = "id, title, image_path, introduction, content, date_created, course_id";

#[derive(Clone)]
pub struct LessonService {
    pool: PgPool,
}

struct LessonRecord {
    title: String,
    introduction: String,
    content: Option<String>,
    /// `None` keeps the stored date on update; create defaults it to today.
    date_created: Option<chrono::NaiveDate>,
    course_id: i32,
}

impl LessonRecord {
    fn from_input(input: LessonInput) -> Result<Self, AppError> {
        let title = RequestValidator::required(
            "title",
            input.title.as_deref(),
            FieldRule::required().max_length(TITLE_MAX_LENGTH),
        )?;
        let introduction =
            RequestValidator::required("introduction", input.introduction.as_deref(), FieldRule::required())?;
        Ok(LessonRecord {
            title,
            introduction,
            content: non_blank(input.content),
            date_created: input.date_created,
            course_id: input.course_id,
        })
    }
}

impl LessonService {
    pub fn new(pool: PgPool) -> Self {
        LessonService { pool }
    }

    /// All lessons, or only those of one course.
    pub async fn list(&self, course_id: Option<i32>) -> Result<Vec<Lesson>, AppError> {
        let lessons = match course_id {
            Some(course_id) => {
                sqlx::query_as::<_, Lesson>(&format!(
                    "SELECT {} FROM {} WHERE course_id = $1 ORDER BY id",
                    LESSON_COLUMNS,
                    tables::LESSONS
                ))
                .bind(course_id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Lesson>(&format!(
                    "SELECT {} FROM {} ORDER BY id",
                    LESSON_COLUMNS,
                    tables::LESSONS
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(lessons)
    }

    pub async fn get(&self, id: i32) -> Result<Option<Lesson>, AppError> {
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "SELECT {} FROM {} WHERE id = $1",
            LESSON_COLUMNS,
            tables::LESSONS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lesson)
    }

    pub async fn count(&self) -> Result<i64, AppError> {
        Ok(count_rows(&self.pool, tables::LESSONS).await?)
    }

    pub async fn create(&self, input: LessonInput) -> Result<Lesson, AppError> {
        let rec = LessonRecord::from_input(input)?;
        self.ensure_course(rec.course_id).await?;
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "INSERT INTO {} (title, introduction, content, date_created, course_id) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            tables::LESSONS,
            LESSON_COLUMNS
        ))
        .bind(&rec.title)
        .bind(&rec.introduction)
        .bind(&rec.content)
        .bind(rec.date_created.unwrap_or_else(crate::today))
        .bind(rec.course_id)
        .fetch_one(&self.pool)
        .await?;
        tracing::info!(lesson_id = lesson.id, course_id = lesson.course_id, "lesson created");
        Ok(lesson)
    }

    /// Replace the editable fields. The image path is left as is.
    pub async fn update(&self, id: i32, input: LessonInput) -> Result<Option<Lesson>, AppError> {
        let rec = LessonRecord::from_input(input)?;
        self.ensure_course(rec.course_id).await?;
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "UPDATE {} SET title = $2, introduction = $3, content = $4, date_created = COALESCE($5, date_created), course_id = $6 WHERE id = $1 RETURNING {}",
            tables::LESSONS,
            LESSON_COLUMNS
        ))
        .bind(id)
        .bind(&rec.title)
        .bind(&rec.introduction)
        .bind(&rec.content)
        .bind(rec.date_created)
        .bind(rec.course_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lesson)
    }

    /// Set the image path; returns the updated lesson and the path it replaced.
    pub async fn set_image(
        &self,
        id: i32,
        image_path: &str,
    ) -> Result<Option<(Lesson, Option<String>)>, AppError> {
        RequestValidator::check(
            "imagePath",
            Some(image_path),
            FieldRule::optional().max_length(IMAGE_PATH_MAX_LENGTH),
        )?;
        let mut tx = self.pool.begin().await?;
        let previous: Option<Option<String>> = sqlx::query_scalar(&format!(
            "SELECT image_path FROM {} WHERE id = $1 FOR UPDATE",
            tables::LESSONS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(previous) = previous else {
            return Ok(None);
        };
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "UPDATE {} SET image_path = $2 WHERE id = $1 RETURNING {}",
            tables::LESSONS,
            LESSON_COLUMNS
        ))
        .bind(id)
        .bind(image_path)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(Some((lesson, previous)))
    }

    /// Delete a lesson; returns it so callers can clean up its image.
    pub async fn delete(&self, id: i32) -> Result<Option<Lesson>, AppError> {
        let lesson = sqlx::query_as::<_, Lesson>(&format!(
            "DELETE FROM {} WHERE id = $1 RETURNING {}",
            tables::LESSONS,
            LESSON_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lesson)
    }

    async fn ensure_course(&self, course_id: i32) -> Result<(), AppError> {
        let (exists,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            tables::COURSES
        ))
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;
        if !exists {
            return Err(AppError::Validation(format!("course {} does not exist", course_id)));
        }
        Ok(())
    }
}
