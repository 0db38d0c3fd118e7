//! Cookie parsing and `Set-Cookie` construction

use hyper::header::COOKIE;
use hyper::HeaderMap;
use std::time::Duration;

/// Cookie carrying the opaque session token
pub const SESSION_COOKIE: &str = "_factbook_session";

/// Cookie carrying the CSRF token for browser scripts to echo back
pub const CSRF_COOKIE: &str = "CSRF-TOKEN";

/// Attributes shared by every cookie the server sets
#[derive(Debug, Clone, Copy)]
pub struct CookieOptions {
    pub secure: bool,
    pub max_age: Duration,
}

impl CookieOptions {
    /// `Set-Cookie` value for the session token (hidden from scripts)
    pub fn session(&self, token: &str) -> String {
        self.build(SESSION_COOKIE, token, true, Some(self.max_age))
    }

    /// `Set-Cookie` value for the CSRF token (readable by scripts)
    pub fn csrf(&self, token: &str) -> String {
        self.build(CSRF_COOKIE, token, false, Some(self.max_age))
    }

    /// `Set-Cookie` values that remove both cookies
    pub fn clear_all(&self) -> [String; 2] {
        [
            self.build(SESSION_COOKIE, "", true, Some(Duration::ZERO)),
            self.build(CSRF_COOKIE, "", false, Some(Duration::ZERO)),
        ]
    }

    fn build(&self, name: &str, value: &str, http_only: bool, max_age: Option<Duration>) -> String {
        let mut cookie = format!("{}={}; Path=/; SameSite=Lax", name, value);
        if let Some(age) = max_age {
            cookie.push_str(&format!("; Max-Age={}", age.as_secs()));
        }
        if http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Find a cookie value by name across all `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|h| h.to_str().ok())
        .flat_map(|h| h.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
