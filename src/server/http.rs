//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Request bodies are
//! collected up front (bounded by `MAX_BODY_BYTES`) and the buffered request
//! is handed to [`dispatch`], which tests drive directly.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::auth::{csrf, read_cookie, requires_csrf, CookieOptions, Identity, SessionStore, SESSION_COOKIE};
use crate::config::Args;
use crate::db::RecordStore;
use crate::routes::response::{
    error_response, from_error, method_not_allowed_response, not_found_response,
    preflight_response, respond,
};
use crate::routes::{self, facts, members, static_files, Route};
use crate::types::FactbookError;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Users, members, and facts
    pub store: Arc<dyn RecordStore>,
    /// Live sign-in sessions
    pub sessions: Arc<SessionStore>,
    /// Attributes for every cookie the server sets
    pub cookies: CookieOptions,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args, store: Arc<dyn RecordStore>) -> Self {
        let ttl = args.session_ttl();
        let cookies = CookieOptions {
            secure: args.secure_cookies,
            max_age: ttl,
        };

        Self {
            args,
            store,
            sessions: Arc::new(SessionStore::new(ttl)),
            cookies,
            started_at: Instant::now(),
        }
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), FactbookError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "factbook listening on {} ({} store)",
        state.args.listen,
        state.store.backend()
    );

    if state.args.dev_mode {
        warn!("Development mode enabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { Ok::<_, Infallible>(handle_request(state, addr, req).await) }
                    });

                    if let Err(err) = http1::Builder::new()
                        .preserve_header_case(true)
                        .title_case_headers(true)
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Buffer the request body, then dispatch
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Response<Full<Bytes>> {
    let (parts, body) = req.into_parts();

    let bytes = match Limited::new(body, state.args.max_body_bytes).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<http_body_util::LengthLimitError>() => {
            warn!("[{}] {} {} body exceeds limit", addr, parts.method, parts.uri.path());
            return error_response(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large");
        }
        Err(e) => {
            warn!("[{}] Failed to read body: {}", addr, e);
            return error_response(StatusCode::BAD_REQUEST, "Failed to read request body");
        }
    };

    dispatch(&state, Request::from_parts(parts, bytes)).await
}

/// Route a buffered request and log its outcome
pub async fn dispatch(state: &AppState, req: Request<Bytes>) -> Response<Full<Bytes>> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let span = tracing::info_span!("request", id = %Uuid::new_v4(), %method, %path);

    let response = route(state, req).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "{} {}",
            method,
            path
        )
    });
    response
}

async fn route(state: &AppState, req: Request<Bytes>) -> Response<Full<Bytes>> {
    let method = req.method().clone();
    let path = req.uri().path();

    if method == Method::OPTIONS {
        return preflight_response();
    }

    let Some(route) = Route::parse(path) else {
        return not_found_response(path);
    };
    if !route.allows(&method) {
        return method_not_allowed_response();
    }

    // Resolve the session, if any, before anything acts on it
    let headers = req.headers();
    let token = read_cookie(headers, SESSION_COOKIE);
    let session = token.and_then(|t| state.sessions.resolve(t));

    if let Some(session) = &session {
        if requires_csrf(&method)
            && !route.starts_session()
            && !csrf::verify_header(headers, &session.csrf_token)
        {
            warn!(user_id = %session.user_id, "Rejected request with bad CSRF token");
            return from_error(&FactbookError::Forbidden(
                "Invalid authenticity token.".into(),
            ));
        }
    }

    let body = req.body();
    if route.is_api() {
        let Some(session) = &session else {
            return from_error(&FactbookError::Unauthorized(
                "You need to sign in before continuing.".into(),
            ));
        };
        let identity = Identity::from(session);
        return respond(api_request(state, &identity, &method, route, body).await);
    }

    match route {
        Route::Health => routes::health_check(state),
        Route::Ready => routes::readiness_check(state).await,
        Route::Asset => static_files::serve(&state.args.public_dir, &method, path).await,
        Route::SignUp => routes::sign_up(state, headers, body).await,
        Route::SignIn => routes::sign_in(state, headers, body).await,
        Route::SignOut => routes::sign_out(state, token.filter(|_| session.is_some())),
        _ => method_not_allowed_response(),
    }
}

async fn api_request(
    state: &AppState,
    identity: &Identity,
    method: &Method,
    route: Route<'_>,
    body: &Bytes,
) -> crate::types::Result<Response<Full<Bytes>>> {
    match (route, method) {
        (Route::Members, &Method::GET) => members::list(state, identity).await,
        (Route::Members, _) => members::create(state, identity, body).await,
        (Route::Member(id), &Method::GET) => members::show(state, identity, id).await,
        (Route::Member(id), &Method::DELETE) => members::delete(state, identity, id).await,
        (Route::Member(id), _) => members::update(state, identity, id, body).await,
        (Route::Facts(member_id), &Method::GET) => facts::list(state, identity, member_id).await,
        (Route::Facts(member_id), _) => facts::create(state, identity, member_id, body).await,
        (Route::Fact(member_id, id), &Method::GET) => {
            facts::show(state, identity, member_id, id).await
        }
        (Route::Fact(member_id, id), &Method::DELETE) => {
            facts::delete(state, identity, member_id, id).await
        }
        (Route::Fact(member_id, id), _) => {
            facts::update(state, identity, member_id, id, body).await
        }
        _ => Ok(method_not_allowed_response()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn state() -> AppState {
        AppState::new(Args::for_tests(), Arc::new(MemoryStore::new()))
    }

    fn request(method: Method, path: &str) -> Request<Bytes> {
        Request::builder()
            .method(method)
            .uri(path)
            .body(Bytes::new())
            .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_path_and_method() {
        let state = state();
        assert_eq!(
            dispatch(&state, request(Method::GET, "/nope")).await.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            dispatch(&state, request(Method::GET, "/users/sign_out")).await.status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
        assert_eq!(
            dispatch(&state, request(Method::OPTIONS, "/api/v1/members")).await.status(),
            StatusCode::NO_CONTENT
        );
    }

    #[tokio::test]
    async fn test_api_requires_session() {
        let state = state();
        for (method, path) in [
            (Method::GET, "/api/v1/members"),
            (Method::POST, "/api/v1/members"),
            (Method::DELETE, "/api/v1/members/abc"),
            (Method::GET, "/api/v1/members/abc/facts"),
            (Method::PATCH, "/api/v1/members/abc/facts/def"),
        ] {
            let response = dispatch(&state, request(method, path)).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            assert_eq!(
                &body[..],
                br#"{"message":"You need to sign in before continuing."}"#
            );
        }

        // Non-API routes stay open
        assert_eq!(
            dispatch(&state, request(Method::GET, "/health")).await.status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn test_session_cookie_and_csrf() {
        let state = state();
        let (token, session) = state
            .sessions
            .create(bson::oid::ObjectId::new(), "ada@example.com");
        let cookie = format!("{}={}", SESSION_COOKIE, token);

        let listed = Request::builder()
            .method(Method::GET)
            .uri("/api/v1/members")
            .header("Cookie", &cookie)
            .body(Bytes::new())
            .unwrap();
        assert_eq!(dispatch(&state, listed).await.status(), StatusCode::OK);

        let forged = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/members")
            .header("Cookie", &cookie)
            .body(Bytes::from(r#"{"first_name":"Ada","last_name":"Lovelace"}"#))
            .unwrap();
        assert_eq!(dispatch(&state, forged).await.status(), StatusCode::FORBIDDEN);

        let genuine = Request::builder()
            .method(Method::POST)
            .uri("/api/v1/members")
            .header("Cookie", &cookie)
            .header("X-CSRF-Token", &session.csrf_token)
            .body(Bytes::from(r#"{"first_name":"Ada","last_name":"Lovelace"}"#))
            .unwrap();
        assert_eq!(dispatch(&state, genuine).await.status(), StatusCode::CREATED);
    }
}
