use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{event, Level};

use super::expiry::{is_expired, Clock};
use crate::core::types::TokenSet;
use crate::error::Error;
use crate::session::Session;

/// Exchanges a refresh token for a new token set.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self, token_set: &TokenSet) -> Result<TokenSet, Error>;
}

/// Body of `GET /auth-status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthStatus {
    #[serde(rename = "isAuthenticated")]
    pub is_authenticated: bool,
    #[serde(rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl AuthStatus {
    pub fn unauthenticated() -> Self {
        Self {
            is_authenticated: false,
            tenant_id: None,
        }
    }

    fn authenticated(session: &Session) -> Self {
        Self {
            is_authenticated: true,
            tenant_id: session.active_tenant_id().map(ToString::to_string),
        }
    }
}

/// Keeps a session's token set usable, refreshing it once when expired.
#[derive(Clone)]
pub struct RefreshCoordinator {
    refresher: Arc<dyn TokenRefresher>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefreshCoordinator {{ ... }}")
    }
}

impl RefreshCoordinator {
    pub fn new(refresher: Arc<dyn TokenRefresher>, clock: Arc<dyn Clock>) -> Self {
        Self { refresher, clock }
    }

    /// Report whether `session` is authenticated, refreshing expired tokens.
    ///
    /// A failed refresh leaves the stored token set as it was and reports
    /// the session as unauthenticated; it is never returned as an error.
    /// Two concurrent calls for one session may both refresh, and whichever
    /// caller saves last wins.
    #[tracing::instrument(skip_all, fields(tenant_id = ?session.active_tenant_id()))]
    pub async fn ensure_valid(&self, session: &mut Session) -> AuthStatus {
        let token_set = match session.token_set() {
            Some(token_set) => token_set,
            None => return AuthStatus::unauthenticated(),
        };

        if !is_expired(token_set, self.clock.as_ref()) {
            return AuthStatus::authenticated(session);
        }

        if token_set.refresh_token.is_none() {
            event!(Level::DEBUG, "Token set expired without a refresh token");
            return AuthStatus::unauthenticated();
        }

        event!(Level::DEBUG, "Token set expired, refreshing");
        let refreshed = self.refresher.refresh(token_set).await;
        match refreshed {
            Ok(fresh) => {
                session.replace_token_set(fresh);
                event!(Level::INFO, "Token set refreshed");
                AuthStatus::authenticated(session)
            }
            Err(e) => {
                event!(Level::WARN, error = %e, "Error refreshing token");
                AuthStatus::unauthenticated()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::expiry::FixedClock;
    use crate::session::tests::{authenticated, token_set};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const NOW: u64 = 1_700_000_000;

    struct FakeRefresher {
        calls: AtomicUsize,
        seen: Mutex<Vec<Option<String>>>,
        result: Result<TokenSet, ()>,
    }

    impl FakeRefresher {
        fn returning(result: Result<TokenSet, ()>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                result,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TokenRefresher for FakeRefresher {
        async fn refresh(&self, token_set: &TokenSet) -> Result<TokenSet, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen
                .lock()
                .unwrap()
                .push(token_set.refresh_token.clone());
            self.result.clone().map_err(|_| Error::Provider {
                operation: "token refresh",
                status: Some(400),
                detail: "invalid_grant".into(),
            })
        }
    }

    fn coordinator(refresher: Arc<FakeRefresher>) -> RefreshCoordinator {
        RefreshCoordinator::new(refresher, Arc::new(FixedClock::at_secs(NOW)))
    }

    #[tokio::test]
    async fn no_token_set_is_unauthenticated() {
        let refresher = FakeRefresher::returning(Err(()));
        let mut session = Session::new();

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert_eq!(status, AuthStatus::unauthenticated());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn valid_token_set_skips_refresh() {
        let refresher = FakeRefresher::returning(Err(()));
        let mut session = authenticated(token_set("AT", Some("RT"), Some(NOW + 60)), "T1");

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert!(status.is_authenticated);
        assert_eq!(status.tenant_id.as_deref(), Some("T1"));
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn expired_token_set_is_refreshed_once() {
        let fresh = token_set("a2", Some("r2"), Some(NOW + 3600));
        let refresher = FakeRefresher::returning(Ok(fresh.clone()));
        let mut session = authenticated(token_set("AT", Some("r1"), Some(NOW - 10)), "T1");

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert_eq!(
            status,
            AuthStatus {
                is_authenticated: true,
                tenant_id: Some("T1".into()),
            }
        );
        assert_eq!(refresher.calls(), 1);
        assert_eq!(*refresher.seen.lock().unwrap(), vec![Some("r1".to_string())]);
        assert_eq!(session.token_set(), Some(&fresh));
        assert_eq!(session.token_set().unwrap().access_token, "a2");
    }

    #[tokio::test]
    async fn failed_refresh_leaves_tokens_untouched() {
        let refresher = FakeRefresher::returning(Err(()));
        let original = token_set("AT", Some("r1"), Some(NOW - 10));
        let mut session = authenticated(original.clone(), "T1");

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert_eq!(status, AuthStatus::unauthenticated());
        assert_eq!(refresher.calls(), 1);
        assert_eq!(session.token_set(), Some(&original));
    }

    #[tokio::test]
    async fn expired_without_refresh_token_makes_no_call() {
        let refresher = FakeRefresher::returning(Ok(token_set("a2", None, Some(NOW + 60))));
        let mut session = authenticated(token_set("AT", None, Some(NOW - 10)), "T1");

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert_eq!(status, AuthStatus::unauthenticated());
        assert_eq!(refresher.calls(), 0);
    }

    #[tokio::test]
    async fn missing_expiry_triggers_refresh() {
        let refresher = FakeRefresher::returning(Ok(token_set("a2", Some("r2"), Some(NOW + 60))));
        let mut session = authenticated(token_set("AT", Some("r1"), None), "T1");

        let status = coordinator(refresher.clone()).ensure_valid(&mut session).await;

        assert!(status.is_authenticated);
        assert_eq!(refresher.calls(), 1);
    }

    #[tokio::test]
    async fn missing_tenant_is_tolerated() {
        let refresher = FakeRefresher::returning(Err(()));
        let mut session: Session = serde_json::from_value(serde_json::json!({
            "token_set": { "access_token": "AT", "expires_at": NOW + 60 },
            "identity": null,
            "active_tenant": null
        }))
        .unwrap();

        let status = coordinator(refresher).ensure_valid(&mut session).await;

        assert!(status.is_authenticated);
        assert_eq!(status.tenant_id, None);
    }

    #[test]
    fn status_serializes_like_the_frontend_expects() {
        let status = AuthStatus {
            is_authenticated: true,
            tenant_id: Some("T1".into()),
        };
        assert_eq!(
            serde_json::to_string(&status).unwrap(),
            r#"{"isAuthenticated":true,"tenantId":"T1"}"#
        );
        assert_eq!(
            serde_json::to_string(&AuthStatus::unauthenticated()).unwrap(),
            r#"{"isAuthenticated":false}"#
        );
    }
}
