//! Catalog services: course and lesson persistence with input validation.

mod course;
mod lesson;
mod validation;

pub use course::CourseService;
pub use lesson::LessonService;
pub use validation::{non_blank, FieldRule, RequestValidator};
