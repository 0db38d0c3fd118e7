//! factbook - members and facts API
//!
//! Signed-in users keep a list of members and attach short facts to each.
//! Every record is private to the user who created it.
//!
//! ## Services
//!
//! - **Sessions**: sign-up, sign-in, and sign-out with server-side cookie
//!   sessions and per-session CSRF tokens
//! - **Members**: CRUD under `/api/v1/members`, scoped to the signed-in user
//! - **Facts**: CRUD nested under each member
//! - **Storage**: MongoDB, or an in-memory store in dev mode

pub mod auth;
pub mod config;
pub mod db;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{dispatch, run, AppState};
pub use types::{FactbookError, Result};
