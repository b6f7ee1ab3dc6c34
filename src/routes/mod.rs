//! Route assembly and the request pipeline.

pub mod catalog;
pub mod common;
pub mod docs;
pub mod home;

pub use catalog::catalog_routes;
pub use common::common_routes;
pub use docs::{docs_routes, ApiDoc};
pub use home::home_routes;

use crate::config::Environment;
use crate::response::error_body;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json, Router,
};
use std::any::Any;
use tower_http::{
    catch_panic::CatchPanicLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

pub const ERROR_PATH: &str = "/Home/Error";
/// 30 days.
pub const HSTS_VALUE: &str = "max-age=2592000";

fn panic_message(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Development shows the panic; production sends the client to the error page.
fn panic_handler(environment: Environment) -> impl Fn(Box<dyn Any + Send + 'static>) -> Response + Clone {
    move |err| {
        let message = panic_message(err.as_ref());
        tracing::error!(panic = %message, "request handler panicked");
        if environment.is_development() {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_body("internal_error", message, None)),
            )
                .into_response()
        } else {
            Redirect::to(ERROR_PATH).into_response()
        }
    }
}

/// Full application: home pages, `/api/v1`, docs, probes, then static files from the web root.
pub fn app_router(state: AppState) -> Router {
    let environment = state.environment;
    let mut router = Router::new()
        .merge(home_routes(state.clone()))
        .merge(common_routes(state.clone()))
        .merge(docs_routes())
        .nest("/api/v1", catalog_routes(state.clone()))
        .fallback_service(ServeDir::new(&state.web_root))
        .layer(CatchPanicLayer::custom(panic_handler(environment)))
        .layer(TraceLayer::new_for_http());
    if !environment.is_development() {
        router = router.layer(SetResponseHeaderLayer::if_not_present(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        ));
    }
    router
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::migration::apply_migrations;
    use crate::storage::LocalFileStorage;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use sqlx::PgPool;
    use std::path::PathBuf;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn config(environment: &str) -> AppConfig {
        let web_root = std::env::temp_dir()
            .join(format!("course-catalog-router-{}", uuid::Uuid::new_v4()))
            .to_string_lossy()
            .into_owned();
        let environment = environment.to_string();
        AppConfig::from_lookup(move |key| match key {
            "DATABASE_URL" => Some("postgres://localhost/unused".into()),
            "APP_ENV" => Some(environment.clone()),
            "WEB_ROOT" => Some(web_root.clone()),
            _ => None,
        })
        .unwrap()
    }

    async fn seeded_app(pool: PgPool, environment: &str) -> anyhow::Result<(Router, PathBuf)> {
        apply_migrations(&pool).await?;
        let config = config(environment);
        let storage = LocalFileStorage::new(&config.web_root, &config.storage.user_content_folder);
        storage.ensure_root().await?;
        let state = AppState::new(pool, &config, Arc::new(storage));
        state.seeder().seed().await?;
        Ok((app_router(state), config.web_root))
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> anyhow::Result<(StatusCode, Value)> {
        let resp = app.clone().oneshot(req).await?;
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        Ok((status, serde_json::from_slice(&bytes).unwrap_or(Value::Null)))
    }

    async fn login(app: &Router, user_name: &str, password: &str) -> anyhow::Result<String> {
        let (status, body) = send(
            app,
            request(
                Method::POST,
                "/api/v1/account/login",
                None,
                Some(json!({ "userName": user_name, "password": password })),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        Ok(body["data"]["token"].as_str().unwrap_or_default().to_string())
    }

    #[sqlx::test(migrations = false)]
    async fn seeded_catalog_is_publicly_readable(pool: PgPool) -> anyhow::Result<()> {
        let (app, _) = seeded_app(pool, "Production").await?;

        let (status, body) = send(&app, request(Method::GET, "/api/v1/courses", None, None)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["count"], 5);
        assert_eq!(body["data"][0]["author"], "vnLab");

        let course_id = body["data"][0]["id"].as_i64().unwrap_or_default();
        let (status, body) = send(
            &app,
            request(Method::GET, &format!("/api/v1/courses/{}/lessons", course_id), None, None),
        )
        .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["count"], 1);

        let (status, body) = send(&app, request(Method::GET, "/", None, None)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["lessons"], 5);

        let (status, _) = send(&app, request(Method::GET, "/api/v1/courses/9999", None, None)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn catalog_writes_need_the_admin_role(pool: PgPool) -> anyhow::Result<()> {
        let (app, _) = seeded_app(pool, "Production").await?;
        let course = json!({ "title": "Rust for Web Developers", "topic": "Rust Programming" });

        let (status, _) = send(&app, request(Method::POST, "/api/v1/courses", None, Some(course.clone()))).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/account/register",
                None,
                Some(json!({
                    "email": "member@example.com",
                    "password": "Member@123",
                    "fullName": "Member",
                    "dob": "1999-05-01"
                })),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        assert_eq!(body["data"]["roles"], json!(["Member"]));

        let member = login(&app, "member@example.com", "Member@123").await?;
        let (status, _) = send(
            &app,
            request(Method::POST, "/api/v1/courses", Some(&member), Some(course.clone())),
        )
        .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let admin = login(&app, crate::seed::data::ADMIN_USER_NAME, crate::seed::data::ADMIN_PASSWORD).await?;
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/v1/courses", Some(&admin), Some(course)),
        )
        .await?;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        let id = body["data"]["id"].as_i64().unwrap_or_default();

        let (status, _) = send(
            &app,
            request(Method::DELETE, &format!("/api/v1/courses/{}", id), Some(&admin), None),
        )
        .await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request(Method::GET, &format!("/api/v1/courses/{}", id), None, None)).await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn sign_out_revokes_the_token(pool: PgPool) -> anyhow::Result<()> {
        let (app, _) = seeded_app(pool, "Production").await?;
        let admin = login(&app, crate::seed::data::ADMIN_USER_NAME, crate::seed::data::ADMIN_PASSWORD).await?;

        let (status, body) = send(&app, request(Method::GET, "/api/v1/account/me", Some(&admin), None)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["fullName"], "Example");
        assert_eq!(body["data"]["roles"], json!(["Admin"]));

        let (status, _) = send(&app, request(Method::POST, "/api/v1/account/logout", Some(&admin), None)).await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, request(Method::GET, "/api/v1/account/me", Some(&admin), None)).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &app,
            request(
                Method::POST,
                "/api/v1/account/login",
                None,
                Some(json!({ "userName": crate::seed::data::ADMIN_USER_NAME, "password": "wrong" })),
            ),
        )
        .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "unauthorized");
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn lesson_image_upload_is_stored_and_served(pool: PgPool) -> anyhow::Result<()> {
        let (app, web_root) = seeded_app(pool, "Development").await?;
        let admin = login(&app, crate::seed::data::ADMIN_USER_NAME, crate::seed::data::ADMIN_PASSWORD).await?;
        let (_, lessons) = send(&app, request(Method::GET, "/api/v1/lessons", None, None)).await?;
        let lesson_id = lessons["data"][0]["id"].as_i64().unwrap_or_default();

        let boundary = "course-catalog-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"cover.png\"\r\nContent-Type: image/png\r\n\r\n",
                b = boundary
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"\x89PNG fake image");
        body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
        let upload = Request::builder()
            .method(Method::POST)
            .uri(format!("/api/v1/lessons/{}/image", lesson_id))
            .header(header::AUTHORIZATION, format!("Bearer {}", admin))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", boundary))
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&app, upload).await?;
        assert_eq!(status, StatusCode::OK, "{body}");
        let image_path = body["data"]["imagePath"].as_str().unwrap_or_default().to_string();
        assert!(image_path.starts_with("/user-content/"));
        assert!(image_path.ends_with(".png"));
        let stored = web_root.join(image_path.trim_start_matches('/'));
        assert!(stored.exists());

        let resp = app
            .clone()
            .oneshot(request(Method::GET, &format!("/api/v1/lessons/{}/image", lesson_id), None, None))
            .await?;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = to_bytes(resp.into_body(), usize::MAX).await?;
        assert_eq!(&bytes[..], b"\x89PNG fake image");

        let (status, _) = send(
            &app,
            request(Method::DELETE, &format!("/api/v1/lessons/{}", lesson_id), Some(&admin), None),
        )
        .await?;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!stored.exists());
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn docs_and_hsts(pool: PgPool) -> anyhow::Result<()> {
        let (prod, _) = seeded_app(pool.clone(), "Production").await?;
        let resp = prod.clone().oneshot(request(Method::GET, "/health", None, None)).await?;
        assert_eq!(resp.headers()[header::STRICT_TRANSPORT_SECURITY], HSTS_VALUE);

        let (status, doc) = send(&prod, request(Method::GET, docs::OPENAPI_JSON_PATH, None, None)).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["info"]["title"], "Swagger Course Management");

        let (dev, _) = seeded_app(pool, "Development").await?;
        let resp = dev.oneshot(request(Method::GET, "/health", None, None)).await?;
        assert!(resp.headers().get(header::STRICT_TRANSPORT_SECURITY).is_none());
        Ok(())
    }

    #[test]
    fn production_panics_redirect_to_the_error_page() {
        let err: Box<dyn Any + Send> = Box::new("boom");
        let resp = panic_handler(Environment::Production)(err);
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[header::LOCATION], ERROR_PATH);

        let err: Box<dyn Any + Send> = Box::new("boom".to_string());
        let resp = panic_handler(Environment::Development)(err);
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
