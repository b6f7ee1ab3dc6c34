//! Identity subsystem: user and role storage, password hashing, lockout and access tokens.

pub mod password;
mod result;
mod role_manager;
mod sign_in;
mod user_manager;

pub use password::{PasswordHasher, PasswordPolicy};
pub use result::{IdentityError, IdentityResult};
pub use role_manager::RoleManager;
pub use sign_in::{SignInManager, SignInResult};
pub use user_manager::UserManager;

pub const ADMIN_ROLE: &str = "Admin";
pub const MEMBER_ROLE: &str = "Member";
