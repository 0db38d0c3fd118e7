//! Authentication and authorization for factbook
//!
//! Provides:
//! - Password hashing with Argon2
//! - Server-side cookie sessions with per-session CSRF tokens
//! - Ownership checks shared by the resource controllers

pub mod access;
pub mod cookie;
pub mod csrf;
pub mod password;
pub mod session;

pub use access::{check_access, Identity, Owned};
pub use cookie::{read_cookie, CookieOptions, CSRF_COOKIE, SESSION_COOKIE};
pub use csrf::{constant_time_compare, requires_csrf, CSRF_HEADER};
pub use password::{hash_password, verify_password};
pub use session::{Session, SessionStore};
