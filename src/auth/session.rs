//! Session storage
//!
//! In-memory server-side sessions with TTL support. The cookie holds an
//! opaque random token; only its SHA-256 digest is used as the map key.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use bson::oid::ObjectId;
use dashmap::DashMap;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Random bytes per session or CSRF token
const TOKEN_BYTES: usize = 32;

/// How often expired sessions are swept
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// An authenticated session
#[derive(Debug, Clone)]
pub struct Session {
    /// Owning user
    pub user_id: ObjectId,
    /// User e-mail, kept for logging
    pub email: String,
    /// Token the client must echo on mutating requests
    pub csrf_token: String,
    /// When this session stops being valid
    pub expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Session store with concurrent access
pub struct SessionStore {
    /// SHA-256(token) hex -> session
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session, returning the raw token for the cookie
    pub fn create(&self, user_id: ObjectId, email: &str) -> (String, Session) {
        let token = generate_token();
        let session = Session {
            user_id,
            email: email.to_string(),
            csrf_token: generate_token(),
            expires_at: Instant::now() + self.ttl,
        };

        self.sessions.insert(digest(&token), session.clone());
        debug!(user_id = %user_id, "Session created");

        (token, session)
    }

    /// Look up a live session by its raw token
    ///
    /// Expired sessions are dropped on access.
    pub fn resolve(&self, token: &str) -> Option<Session> {
        let key = digest(token);
        let now = Instant::now();

        let session = self.sessions.get(&key).map(|s| s.clone())?;
        if session.is_live(now) {
            return Some(session);
        }

        self.sessions.remove(&key);
        None
    }

    /// End a session. Returns false when no live session matched.
    pub fn revoke(&self, token: &str) -> bool {
        match self.sessions.remove(&digest(token)) {
            Some((_, session)) => session.is_live(Instant::now()),
            None => false,
        }
    }

    /// Cleanup expired entries
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.is_live(now));
        before.saturating_sub(self.sessions.len())
    }

    /// Number of stored sessions (live or not yet swept)
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Spawn a background task to periodically cleanup expired sessions
pub fn spawn_cleanup_task(store: Arc<SessionStore>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CLEANUP_INTERVAL).await;
            let removed = store.cleanup();
            if removed > 0 {
                debug!("Session cleanup: removed {} expired sessions", removed);
            }
        }
    });
    info!("Session cleanup task started");
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn digest(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_resolve() {
        let store = SessionStore::new(Duration::from_secs(60));
        let user_id = ObjectId::new();
        let (token, session) = store.create(user_id, "ada@example.com");

        let resolved = store.resolve(&token).unwrap();
        assert_eq!(resolved.user_id, user_id);
        assert_eq!(resolved.csrf_token, session.csrf_token);
        assert_ne!(token, session.csrf_token);
        assert!(store.resolve("not-a-token").is_none());
    }

    #[test]
    fn test_raw_token_not_stored() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (token, _) = store.create(ObjectId::new(), "ada@example.com");
        assert!(!store.sessions.contains_key(&token));
        assert!(store.sessions.contains_key(&digest(&token)));
    }

    #[test]
    fn test_revoke() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (token, _) = store.create(ObjectId::new(), "ada@example.com");

        assert!(store.revoke(&token));
        assert!(store.resolve(&token).is_none());
        assert!(!store.revoke(&token));
    }

    #[test]
    fn test_expired_session_is_rejected() {
        let store = SessionStore::new(Duration::ZERO);
        let (token, _) = store.create(ObjectId::new(), "ada@example.com");

        assert!(store.resolve(&token).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_cleanup() {
        let store = SessionStore::new(Duration::ZERO);
        store.create(ObjectId::new(), "a@example.com");
        store.create(ObjectId::new(), "b@example.com");
        assert_eq!(store.len(), 2);

        assert_eq!(store.cleanup(), 2);
        assert!(store.is_empty());
    }
}
