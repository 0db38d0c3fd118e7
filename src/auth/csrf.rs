//! CSRF token checks for mutating requests

use hyper::{HeaderMap, Method};

/// Header clients echo the CSRF token in
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Whether a request with this method must carry a CSRF token
pub fn requires_csrf(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

/// Check the `X-CSRF-Token` header against the session's token
pub fn verify_header(headers: &HeaderMap, expected: &str) -> bool {
    headers
        .get(CSRF_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|presented| constant_time_compare(presented, expected))
        .unwrap_or(false)
}

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    #[test]
    fn test_requires_csrf() {
        assert!(requires_csrf(&Method::POST));
        assert!(requires_csrf(&Method::PUT));
        assert!(requires_csrf(&Method::PATCH));
        assert!(requires_csrf(&Method::DELETE));
        assert!(!requires_csrf(&Method::GET));
        assert!(!requires_csrf(&Method::HEAD));
    }

    #[test]
    fn test_verify_header() {
        let mut headers = HeaderMap::new();
        assert!(!verify_header(&headers, "token"));

        headers.insert(CSRF_HEADER, HeaderValue::from_static("token"));
        assert!(verify_header(&headers, "token"));
        assert!(!verify_header(&headers, "other"));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(constant_time_compare("", ""));
    }
}
