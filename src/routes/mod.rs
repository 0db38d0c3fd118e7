//! HTTP routes for factbook

pub mod facts;
pub mod health;
pub mod members;
pub mod response;
pub mod sessions;
pub mod static_files;

pub use health::{health_check, readiness_check};
pub use response::{from_error, json_response, respond};
pub use sessions::{sign_in, sign_out, sign_up};

use hyper::Method;

const MEMBERS_PREFIX: &str = "/api/v1/members";

/// A recognized request path, with its path parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Health,
    Ready,
    SignUp,
    SignIn,
    SignOut,
    Members,
    Member(&'a str),
    Facts(&'a str),
    Fact(&'a str, &'a str),
    Asset,
}

impl<'a> Route<'a> {
    /// Match a request path (without query string)
    pub fn parse(path: &'a str) -> Option<Self> {
        match path {
            "/health" | "/healthz" => return Some(Self::Health),
            "/ready" | "/readyz" => return Some(Self::Ready),
            "/users" => return Some(Self::SignUp),
            "/users/sign_in" => return Some(Self::SignIn),
            "/users/sign_out" => return Some(Self::SignOut),
            _ => {}
        }

        if let Some(rest) = path.strip_prefix(MEMBERS_PREFIX) {
            if !rest.is_empty() && !rest.starts_with('/') {
                return None;
            }
            let segments: Vec<&'a str> = rest.split('/').filter(|s| !s.is_empty()).collect();
            return match segments.as_slice() {
                [] => Some(Self::Members),
                [id] => Some(Self::Member(*id)),
                [member_id, "facts"] => Some(Self::Facts(*member_id)),
                [member_id, "facts", id] => Some(Self::Fact(*member_id, *id)),
                _ => None,
            };
        }

        static_files::is_asset_path(path).then_some(Self::Asset)
    }

    /// Whether `method` is served on this route
    pub fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Health | Self::Ready | Self::Asset => {
                matches!(*method, Method::GET | Method::HEAD)
            }
            Self::SignUp | Self::SignIn => *method == Method::POST,
            Self::SignOut => *method == Method::DELETE,
            Self::Members | Self::Facts(_) => matches!(*method, Method::GET | Method::POST),
            Self::Member(_) | Self::Fact(_, _) => matches!(
                *method,
                Method::GET | Method::PUT | Method::PATCH | Method::DELETE
            ),
        }
    }

    /// Routes that require a signed-in user
    pub fn is_api(&self) -> bool {
        matches!(
            self,
            Self::Members | Self::Member(_) | Self::Facts(_) | Self::Fact(_, _)
        )
    }

    /// Routes that create a session and so cannot present a CSRF token yet
    pub fn starts_session(&self) -> bool {
        matches!(self, Self::SignUp | Self::SignIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_member_routes() {
        assert_eq!(Route::parse("/api/v1/members"), Some(Route::Members));
        assert_eq!(Route::parse("/api/v1/members/"), Some(Route::Members));
        assert_eq!(Route::parse("/api/v1/members/abc"), Some(Route::Member("abc")));
        assert_eq!(
            Route::parse("/api/v1/members/abc/facts"),
            Some(Route::Facts("abc"))
        );
        assert_eq!(
            Route::parse("/api/v1/members/abc/facts/def"),
            Some(Route::Fact("abc", "def"))
        );
        assert_eq!(Route::parse("/api/v1/membersx"), None);
        assert_eq!(Route::parse("/api/v1/members/abc/notes"), None);
        assert_eq!(Route::parse("/api/v1/members/a/facts/b/c"), None);
    }

    #[test]
    fn test_parse_other_routes() {
        assert_eq!(Route::parse("/users"), Some(Route::SignUp));
        assert_eq!(Route::parse("/users/sign_in"), Some(Route::SignIn));
        assert_eq!(Route::parse("/healthz"), Some(Route::Health));
        assert_eq!(Route::parse("/"), Some(Route::Asset));
        assert_eq!(Route::parse("/session_ops.js"), Some(Route::Asset));
        assert_eq!(Route::parse("/nope"), None);
    }

    #[test]
    fn test_allowed_methods() {
        assert!(Route::Member("x").allows(&Method::PATCH));
        assert!(!Route::Members.allows(&Method::DELETE));
        assert!(!Route::SignOut.allows(&Method::GET));
        assert!(Route::Members.is_api());
        assert!(!Route::SignOut.is_api());
        assert!(Route::SignIn.starts_session());
    }
}
