use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{event, Level};

use super::{Session, SessionStore};
use crate::auth::expiry::Clock;
use crate::core::types::SessionId;
use crate::error::Error;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct Entry {
    session: Session,
    expires_at_ms: u64,
}

/// Process-local session store with a rolling time-to-live.
pub struct MemoryStore {
    entries: RwLock<HashMap<SessionId, Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MemoryStore {{ ttl: {:?}, .. }}", self.ttl)
    }
}

impl MemoryStore {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Purge expired sessions forever, once per `every`.
    pub async fn start_clean_up_worker(&self, every: Duration) -> Result<(), Error> {
        let mut interval = tokio::time::interval(every);

        loop {
            interval.tick().await;
            let purged = self.purge_expired().await?;
            if purged > 0 {
                event!(Level::DEBUG, purged, "Purged expired sessions");
            }
        }
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>, Error> {
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        Ok(entries
            .get(id)
            .filter(|e| e.expires_at_ms > now)
            .map(|e| e.session.clone()))
    }

    async fn save(&self, id: &SessionId, session: Session) -> Result<(), Error> {
        let expires_at_ms = self
            .clock
            .now_millis()
            .saturating_add(self.ttl.as_millis() as u64);
        self.entries.write().await.insert(
            id.clone(),
            Entry {
                session,
                expires_at_ms,
            },
        );
        Ok(())
    }

    async fn destroy(&self, id: &SessionId) -> Result<(), Error> {
        self.entries.write().await.remove(id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize, Error> {
        let now = self.clock.now_millis();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.expires_at_ms > now);
        Ok(before - entries.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::expiry::FixedClock;
    use crate::session::tests::{authenticated, token_set};

    fn store(clock: Arc<FixedClock>) -> MemoryStore {
        MemoryStore::new(Duration::from_secs(60), clock)
    }

    #[tokio::test]
    async fn saved_sessions_load_back() {
        let clock = Arc::new(FixedClock::at_secs(1_000));
        let store = store(clock);
        let id = SessionId("sid".into());
        let session = authenticated(token_set("AT", None, Some(2_000)), "T1");

        store.save(&id, session.clone()).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(session));
        assert_eq!(store.load(&SessionId("other".into())).await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_sessions_are_invisible_and_purged() {
        let clock = Arc::new(FixedClock::at_secs(1_000));
        let store = store(clock.clone());
        let id = SessionId("sid".into());
        store.save(&id, Session::new()).await.unwrap();

        clock.advance(Duration::from_secs(60));
        assert_eq!(store.load(&id).await.unwrap(), None);
        assert_eq!(store.len().await, 1);

        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn saving_extends_the_lifetime() {
        let clock = Arc::new(FixedClock::at_secs(1_000));
        let store = store(clock.clone());
        let id = SessionId("sid".into());
        store.save(&id, Session::new()).await.unwrap();

        clock.advance(Duration::from_secs(45));
        store.save(&id, Session::new()).await.unwrap();
        clock.advance(Duration::from_secs(45));

        assert!(store.load(&id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn last_write_wins() {
        let clock = Arc::new(FixedClock::at_secs(1_000));
        let store = store(clock);
        let id = SessionId("sid".into());

        store
            .save(&id, authenticated(token_set("first", None, None), "T1"))
            .await
            .unwrap();
        store
            .save(&id, authenticated(token_set("second", None, None), "T1"))
            .await
            .unwrap();

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert_eq!(loaded.token_set().unwrap().access_token, "second");
    }

    #[tokio::test]
    async fn destroy_removes_the_session() {
        let clock = Arc::new(FixedClock::at_secs(1_000));
        let store = store(clock);
        let id = SessionId("sid".into());
        store.save(&id, Session::new()).await.unwrap();

        store.destroy(&id).await.unwrap();
        assert_eq!(store.load(&id).await.unwrap(), None);
    }
}
