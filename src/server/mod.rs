//! HTTP server for factbook

pub mod http;

pub use http::{dispatch, run, AppState};
