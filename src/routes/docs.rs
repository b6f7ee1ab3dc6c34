//! OpenAPI document and Swagger UI.

use crate::handlers::account::{LoginRequest, LoginResponse, RegisterRequest};
use crate::handlers::home::CatalogSummary;
use crate::handlers::{account, course, home, lesson};
use crate::identity::IdentityError;
use crate::model::{Course, CourseInput, Lesson, LessonInput, UserProfile};
use crate::response::MetaCount;
use axum::Router;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub const SWAGGER_UI_PATH: &str = "/swagger";
pub const OPENAPI_JSON_PATH: &str = "/swagger/v1/swagger.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Swagger Course Management", version = "v1"),
    paths(
        home::index,
        course::list_courses,
        course::get_course,
        course::list_course_lessons,
        course::create_course,
        course::update_course,
        course::delete_course,
        lesson::list_lessons,
        lesson::get_lesson,
        lesson::create_lesson,
        lesson::update_lesson,
        lesson::delete_lesson,
        lesson::upload_lesson_image,
        lesson::get_lesson_image,
        account::register,
        account::login,
        account::logout,
        account::me,
    ),
    components(schemas(
        Course,
        CourseInput,
        Lesson,
        LessonInput,
        UserProfile,
        RegisterRequest,
        LoginRequest,
        LoginResponse,
        CatalogSummary,
        MetaCount,
        IdentityError,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Courses", description = "Course catalog"),
        (name = "Lessons", description = "Lessons and their images"),
        (name = "Account", description = "Registration and sign-in")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

pub fn docs_routes() -> Router {
    Router::new().merge(SwaggerUi::new(SWAGGER_UI_PATH).url(OPENAPI_JSON_PATH, ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_catalog_paths() {
        let doc = ApiDoc::openapi();
        assert_eq!(doc.info.title, "Swagger Course Management");
        assert_eq!(doc.info.version, "v1");
        for path in ["/api/v1/courses", "/api/v1/courses/{id}", "/api/v1/lessons/{id}/image", "/api/v1/account/login"] {
            assert!(doc.paths.paths.contains_key(path), "{path}");
        }
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
