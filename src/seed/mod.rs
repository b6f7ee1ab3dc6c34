//! Startup seeding: roles, the admin account, and sample courses with one lesson each.
//!
//! Every step checks its own table and only writes when that table is empty, so running
//! the seeder on a populated store writes nothing. Steps are independent: a store left
//! half-seeded by an earlier failure is completed step by step, never repaired.

pub mod data;

use crate::error::AppError;
use crate::identity::{RoleManager, UserManager, ADMIN_ROLE, MEMBER_ROLE};
use crate::model::{Credential, Role, User};
use crate::store::{is_table_empty, tables};
use chrono::NaiveDate;
use data::{CourseRef, COURSES, LESSONS};
use sqlx::{PgConnection, PgPool};

/// What one seeding pass wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub roles_created: usize,
    pub admin_created: bool,
    pub admin_assigned: bool,
    pub courses_created: usize,
    pub lessons_created: usize,
}

impl SeedReport {
    pub fn is_noop(&self) -> bool {
        *self == SeedReport::default()
    }
}

pub struct Seeder {
    pool: PgPool,
    users: UserManager,
    roles: RoleManager,
}

impl Seeder {
    pub fn new(pool: PgPool, users: UserManager, roles: RoleManager) -> Self {
        Seeder { pool, users, roles }
    }

    /// Identity failures (e.g. a password policy rejecting the seed password) are logged and
    /// skipped; store errors while writing courses or lessons are returned.
    pub async fn seed(&self) -> Result<SeedReport, AppError> {
        let mut report = SeedReport::default();
        self.seed_roles(&mut report).await?;
        self.seed_admin(&mut report).await?;

        let mut graph = SeedGraph::new(crate::today());
        if is_table_empty(&self.pool, tables::COURSES).await? {
            let mut tx = self.pool.begin().await?;
            for course in 0..graph.courses.len() {
                graph.persist_course(&mut tx, CourseRef(course)).await?;
            }
            tx.commit().await?;
            report.courses_created += graph.courses.len();
        }
        if is_table_empty(&self.pool, tables::LESSONS).await? {
            let mut tx = self.pool.begin().await?;
            let (lessons, courses) = graph.persist_lessons(&mut tx).await?;
            tx.commit().await?;
            report.lessons_created += lessons;
            report.courses_created += courses;
        }

        tracing::info!(
            roles = report.roles_created,
            admin = report.admin_created,
            courses = report.courses_created,
            lessons = report.lessons_created,
            "seeding finished"
        );
        Ok(report)
    }

    async fn seed_roles(&self, report: &mut SeedReport) -> Result<(), AppError> {
        if self.roles.has_any().await? {
            return Ok(());
        }
        for name in [ADMIN_ROLE, MEMBER_ROLE] {
            let result = self.roles.create(Role::new(name)).await?;
            if result.succeeded {
                report.roles_created += 1;
            } else {
                tracing::warn!(role = name, result = %result, "seed role not created");
            }
        }
        Ok(())
    }

    async fn seed_admin(&self, report: &mut SeedReport) -> Result<(), AppError> {
        if self.users.has_any().await? {
            return Ok(());
        }
        let credential = Credential::new(data::ADMIN_USER_NAME)
            .with_email(data::ADMIN_EMAIL)
            .with_phone_number(data::ADMIN_PHONE_NUMBER)
            .with_lockout_enabled(false);
        let admin = User::new(credential, data::ADMIN_FULL_NAME, data::admin_dob());
        let result = self.users.create(admin, data::ADMIN_PASSWORD).await?;
        if !result.succeeded {
            tracing::warn!(user_name = data::ADMIN_USER_NAME, result = %result, "seed user not created");
            return Ok(());
        }
        report.admin_created = true;
        if let Some(user) = self.users.find_by_name(data::ADMIN_USER_NAME).await? {
            let assigned = self.users.add_to_role(&user, ADMIN_ROLE).await?;
            if assigned.succeeded {
                report.admin_assigned = true;
            } else {
                tracing::warn!(result = %assigned, "seed user not added to {}", ADMIN_ROLE);
            }
        }
        Ok(())
    }
}

/// Seed courses and lessons for one pass. Lessons point at their course by [`CourseRef`];
/// a course gets its id when it is first written, and writing a lesson whose course has
/// no id yet writes that course first.
struct SeedGraph {
    courses: Vec<TrackedCourse>,
    today: NaiveDate,
}

struct TrackedCourse {
    seed: &'static data::CourseSeed,
    id: Option<i32>,
}

impl SeedGraph {
    fn new(today: NaiveDate) -> Self {
        SeedGraph {
            courses: COURSES.iter().map(|seed| TrackedCourse { seed, id: None }).collect(),
            today,
        }
    }

    /// Insert the course if it has no id yet. Returns its id and whether it was inserted.
    async fn persist_course(&mut self, conn: &mut PgConnection, course: CourseRef) -> Result<(i32, bool), AppError> {
        let tracked = self
            .courses
            .get_mut(course.0)
            .ok_or_else(|| AppError::Internal(format!("seed course {} does not exist", course.0)))?;
        if let Some(id) = tracked.id {
            return Ok((id, false));
        }
        let id: i32 = sqlx::query_scalar(&format!(
            "INSERT INTO {} (title, topic, release_date, author) VALUES ($1, $2, $3, $4) RETURNING id",
            tables::COURSES
        ))
        .bind(tracked.seed.title)
        .bind(tracked.seed.topic)
        .bind(self.today)
        .bind(tracked.seed.author)
        .fetch_one(&mut *conn)
        .await?;
        tracked.id = Some(id);
        Ok((id, true))
    }

    /// Returns (lessons inserted, courses inserted along the way).
    async fn persist_lessons(&mut self, conn: &mut PgConnection) -> Result<(usize, usize), AppError> {
        let mut courses_inserted = 0;
        for lesson in &LESSONS {
            let (course_id, inserted) = self.persist_course(conn, lesson.course).await?;
            if inserted {
                courses_inserted += 1;
            }
            sqlx::query(&format!(
                "INSERT INTO {} (title, introduction, date_created, course_id) VALUES ($1, $2, $3, $4)",
                tables::LESSONS
            ))
            .bind(lesson.title)
            .bind(lesson.introduction)
            .bind(self.today)
            .bind(course_id)
            .execute(&mut *conn)
            .await?;
        }
        Ok((LESSONS.len(), courses_inserted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::PasswordPolicy;
    use crate::migration::apply_migrations;
    use crate::store::count_rows;

    async fn seeder(pool: &PgPool, policy: PasswordPolicy) -> anyhow::Result<Seeder> {
        apply_migrations(pool).await?;
        let roles = RoleManager::new(pool.clone());
        let users = UserManager::new(pool.clone(), roles.clone(), policy);
        Ok(Seeder::new(pool.clone(), users, roles))
    }

    async fn counts(pool: &PgPool) -> anyhow::Result<[i64; 5]> {
        Ok([
            count_rows(pool, tables::ROLES).await?,
            count_rows(pool, tables::USERS).await?,
            count_rows(pool, tables::COURSES).await?,
            count_rows(pool, tables::LESSONS).await?,
            count_rows(pool, tables::USER_ROLES).await?,
        ])
    }

    #[sqlx::test(migrations = false)]
    async fn seeds_an_empty_store(pool: PgPool) -> anyhow::Result<()> {
        let seeder = seeder(&pool, PasswordPolicy::default()).await?;
        let report = seeder.seed().await?;
        assert_eq!(
            report,
            SeedReport {
                roles_created: 2,
                admin_created: true,
                admin_assigned: true,
                courses_created: 5,
                lessons_created: 5,
            }
        );
        assert_eq!(counts(&pool).await?, [2, 1, 5, 5, 1]);

        let admin = seeder.users.find_by_name("example@gmail.com").await?.expect("admin exists");
        assert!(seeder.users.is_in_role(&admin, ADMIN_ROLE).await?);
        assert!(!seeder.users.is_in_role(&admin, MEMBER_ROLE).await?);
        assert_eq!(admin.full_name, data::ADMIN_FULL_NAME);
        assert_eq!(admin.dob, data::admin_dob());
        assert_eq!(admin.credential.phone_number.as_deref(), Some("0987654321"));
        assert_eq!(admin.credential.email.as_deref(), Some("example@gmail.com"));
        assert!(!admin.credential.lockout_enabled);
        assert!(seeder.users.check_password(&admin, data::ADMIN_PASSWORD).await?);

        let role_names: Vec<(String, String)> = seeder
            .roles
            .all()
            .await?
            .into_iter()
            .map(|r| (r.name, r.normalized_name))
            .collect();
        assert_eq!(
            role_names,
            vec![
                ("Admin".to_string(), "ADMIN".to_string()),
                ("Member".to_string(), "MEMBER".to_string())
            ]
        );
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn second_run_writes_nothing(pool: PgPool) -> anyhow::Result<()> {
        let seeder = seeder(&pool, PasswordPolicy::default()).await?;
        seeder.seed().await?;
        let before = counts(&pool).await?;

        let report = seeder.seed().await?;
        assert!(report.is_noop(), "{:?}", report);
        assert_eq!(counts(&pool).await?, before);

        seeder.seed().await?;
        assert_eq!(counts(&pool).await?, before);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn existing_roles_are_not_duplicated(pool: PgPool) -> anyhow::Result<()> {
        let seeder = seeder(&pool, PasswordPolicy::default()).await?;
        seeder.roles.create(Role::new(ADMIN_ROLE)).await?;
        seeder.roles.create(Role::new(MEMBER_ROLE)).await?;

        let report = seeder.seed().await?;
        assert_eq!(report.roles_created, 0);
        assert!(report.admin_created);
        assert!(report.admin_assigned);
        assert_eq!(counts(&pool).await?, [2, 1, 5, 5, 1]);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn lessons_reference_their_seeded_courses(pool: PgPool) -> anyhow::Result<()> {
        let seeder = seeder(&pool, PasswordPolicy::default()).await?;
        seeder.seed().await?;

        let pairs: Vec<(String, String, Option<String>)> = sqlx::query_as(&format!(
            "SELECT l.title, c.title, c.topic FROM {} l JOIN {} c ON c.id = l.course_id ORDER BY l.id",
            tables::LESSONS,
            tables::COURSES
        ))
        .fetch_all(&pool)
        .await?;
        assert_eq!(pairs.len(), LESSONS.len());
        for ((lesson_title, course_title, topic), seed) in pairs.iter().zip(LESSONS.iter()) {
            let course = &COURSES[seed.course.0];
            assert_eq!(lesson_title, seed.title);
            assert_eq!(course_title, course.title);
            assert_eq!(topic.as_deref(), Some(course.topic));
        }
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn rejected_seed_password_skips_role_assignment(pool: PgPool) -> anyhow::Result<()> {
        let policy = PasswordPolicy::default().with_required_length(20);
        let seeder = seeder(&pool, policy).await?;

        let report = seeder.seed().await?;
        assert!(!report.admin_created);
        assert!(!report.admin_assigned);
        assert_eq!(counts(&pool).await?, [2, 0, 5, 5, 0]);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn lessons_bring_their_own_courses_when_only_lessons_are_missing(pool: PgPool) -> anyhow::Result<()> {
        let seeder = seeder(&pool, PasswordPolicy::default()).await?;
        seeder.seed().await?;
        sqlx::query(&format!("DELETE FROM {}", tables::LESSONS))
            .execute(&pool)
            .await?;

        let report = seeder.seed().await?;
        assert_eq!(report.lessons_created, 5);
        assert_eq!(report.courses_created, 5);
        assert_eq!(count_rows(&pool, tables::COURSES).await?, 10);

        let orphaned: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} l LEFT JOIN {} c ON c.id = l.course_id WHERE c.id IS NULL",
            tables::LESSONS,
            tables::COURSES
        ))
        .fetch_one(&pool)
        .await?;
        assert_eq!(orphaned, 0);
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn missing_schema_is_an_error(pool: PgPool) -> anyhow::Result<()> {
        let roles = RoleManager::new(pool.clone());
        let users = UserManager::new(pool.clone(), roles.clone(), PasswordPolicy::default());
        let seeder = Seeder::new(pool, users, roles);
        assert!(matches!(seeder.seed().await, Err(AppError::Db(_))));
        Ok(())
    }

    #[sqlx::test(migrations = false)]
    async fn unknown_course_reference_is_internal(pool: PgPool) -> anyhow::Result<()> {
        apply_migrations(&pool).await?;
        let mut conn = pool.acquire().await?;
        let mut graph = SeedGraph::new(crate::today());
        let err = graph.persist_course(&mut *conn, CourseRef(COURSES.len())).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert!(is_table_empty(&pool, tables::COURSES).await?);
        Ok(())
    }
}
