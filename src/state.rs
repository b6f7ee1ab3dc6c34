//! Composition root: every service a request handler needs, built once at boot.

use crate::config::{AppConfig, Environment};
use crate::identity::{PasswordPolicy, RoleManager, SignInManager, UserManager};
use crate::seed::Seeder;
use crate::service::{CourseService, LessonService};
use crate::storage::StorageService;
use sqlx::PgPool;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub environment: Environment,
    pub web_root: PathBuf,
    pub max_upload_bytes: usize,
    pub courses: CourseService,
    pub lessons: LessonService,
    pub roles: RoleManager,
    pub users: UserManager,
    pub sign_in: SignInManager,
    pub storage: Arc<dyn StorageService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig, storage: Arc<dyn StorageService>) -> Self {
        let policy = PasswordPolicy::default().with_required_length(config.password_required_length);
        let roles = RoleManager::new(pool.clone());
        let users = UserManager::new(pool.clone(), roles.clone(), policy);
        let sign_in = SignInManager::new(pool.clone(), users.clone());
        AppState {
            courses: CourseService::new(pool.clone()),
            lessons: LessonService::new(pool.clone()),
            environment: config.environment,
            web_root: config.web_root.clone(),
            max_upload_bytes: config.max_upload_bytes,
            roles,
            users,
            sign_in,
            storage,
            pool,
        }
    }

    pub fn seeder(&self) -> Seeder {
        Seeder::new(self.pool.clone(), self.users.clone(), self.roles.clone())
    }
}
