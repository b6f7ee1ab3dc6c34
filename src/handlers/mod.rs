//! HTTP handlers: home pages, catalog CRUD and account endpoints.

pub mod account;
pub mod course;
pub mod home;
pub mod lesson;
