use chrono::Utc;
use dashmap::DashMap;

use synapse_core::auth::Claims;
use synapse_core::{RateLimiter, SessionId, SessionLimits};

/// Per-connection session state, exclusively owned by that connection's
/// task. Only the initialize handler mutates the identity fields; the
/// limiter is mutated by its own admission checks.
pub struct Session {
    pub id: SessionId,
    pub client_name: String,
    pub client_version: String,
    pub created_at: String,
    pub limiter: RateLimiter,
    pub claims: Option<Claims>,
}

impl Session {
    /// Construct a fresh session with its own limiter instance. The limiter
    /// is built here, per call, never from a shared default value, so two
    /// sessions can never end up metering against the same bucket.
    pub fn new(limits: SessionLimits) -> Self {
        Self {
            id: SessionId::new(),
            client_name: "unknown".to_string(),
            client_version: "1.0".to_string(),
            created_at: Utc::now().to_rfc3339(),
            limiter: RateLimiter::new(limits),
            claims: None,
        }
    }

    pub fn with_claims(mut self, claims: Option<Claims>) -> Self {
        self.claims = claims;
        self
    }
}

/// Connection metadata visible outside the owning task.
#[derive(Clone, Debug)]
pub struct SessionMeta {
    pub connected_at: String,
}

/// Registry of live sessions, used for the active-connection gauge and the
/// readiness surface. Session state itself stays with the connection task.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionMeta>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, session: &Session) {
        self.sessions.insert(
            session.id.clone(),
            SessionMeta {
                connected_at: session.created_at.clone(),
            },
        );
    }

    pub fn unregister(&self, id: &SessionId) {
        self.sessions.remove(id);
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_session_defaults() {
        let session = Session::new(SessionLimits::default());
        assert!(session.id.as_str().starts_with("sess_"));
        assert_eq!(session.client_name, "unknown");
        assert_eq!(session.client_version, "1.0");
        assert!(session.claims.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sessions_own_independent_limiters() {
        let limits = SessionLimits {
            rate_per_sec: 1.0,
            burst: 3,
        };
        let mut a = Session::new(limits);
        let mut b = Session::new(limits);

        // Drain one session's bucket entirely.
        for _ in 0..3 {
            a.limiter.take(1).await;
        }
        assert_eq!(a.limiter.tokens(), 0.0);

        // The other session's bucket must be untouched.
        assert_eq!(b.limiter.tokens(), 3.0);
        b.limiter.take(1).await;
        assert_eq!(b.limiter.tokens(), 2.0);
    }

    #[test]
    fn registry_tracks_connection_count() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.count(), 0);

        let s1 = Session::new(SessionLimits::default());
        let s2 = Session::new(SessionLimits::default());
        registry.register(&s1);
        registry.register(&s2);
        assert_eq!(registry.count(), 2);

        registry.unregister(&s1.id);
        assert_eq!(registry.count(), 1);
        registry.unregister(&s2.id);
        assert_eq!(registry.count(), 0);
    }
}
