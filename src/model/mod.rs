//! Entity model: catalog records and the identity-owned user/role shapes.

pub mod course;
pub mod lesson;
pub mod user;

pub use course::{Course, CourseInput};
pub use lesson::{Lesson, LessonInput};
pub use user::{Credential, Role, User, UserProfile};
