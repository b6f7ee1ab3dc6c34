//! Baseline rows inserted into an empty store.

use chrono::NaiveDate;

pub const ADMIN_USER_NAME: &str = "example@gmail.com";
pub const ADMIN_EMAIL: &str = "example@gmail.com";
pub const ADMIN_FULL_NAME: &str = "Example";
pub const ADMIN_PHONE_NUMBER: &str = "0987654321";
pub const ADMIN_PASSWORD: &str = "Admin@123";

pub fn admin_dob() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default()
}

pub struct CourseSeed {
    pub title: &'static str,
    pub topic: &'static str,
    pub author: &'static str,
}

/// Index of a course within [`COURSES`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CourseRef(pub usize);

pub struct LessonSeed {
    pub course: CourseRef,
    pub title: &'static str,
    pub introduction: &'static str,
}

pub static COURSES: [CourseSeed; 5] = [
    CourseSeed {
        title: "ASP.NET Core MVC",
        topic: ".NET Programming",
        author: "vnLab",
    },
    CourseSeed {
        title: "ASP.NET Core API",
        topic: ".NET Programming",
        author: "vnLab",
    },
    CourseSeed {
        title: "Java Spring Boot",
        topic: "Java Programming",
        author: "vnLab",
    },
    CourseSeed {
        title: "Laravel - The PHP Framework",
        topic: "PHP Programming",
        author: "vnLab",
    },
    CourseSeed {
        title: "Angular Tutorial For Beginner",
        topic: "Angular Programming",
        author: "vnLab",
    },
];

pub static LESSONS: [LessonSeed; 5] = [
    LessonSeed {
        course: CourseRef(0),
        title: "Tutorial: Get started with ASP.NET Core",
        introduction: "This tutorial shows how to create and run an ASP.NET Core web app using the .NET Core CLI.",
    },
    LessonSeed {
        course: CourseRef(1),
        title: "Choose between controller-based APIs and minimal APIs",
        introduction: "ASP.NET Core supports two approaches to creating APIs: a controller-based approach and minimal APIs. Controllers in an API project are classes that derive from ControllerBase.",
    },
    LessonSeed {
        course: CourseRef(2),
        title: "Spring Framework",
        introduction: "The Spring Framework provides a comprehensive programming and configuration model for modern Java-based enterprise applications - on any kind of deployment platform.",
    },
    LessonSeed {
        course: CourseRef(3),
        title: "The PHP Framework for Web Artisans",
        introduction: "Laravel is a web application framework with expressive, elegant syntax. We’ve already laid the foundation — freeing you to create without sweating the small things.",
    },
    LessonSeed {
        course: CourseRef(4),
        title: "Getting started with standalone components",
        introduction: "Standalone components provide a simplified way to build Angular applications. Standalone components, directives, and pipes aim to streamline the authoring experience by reducing the need for NgModules.",
    },
];
