use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use shared_models::auth::{Session, SessionProvider, User};
use shared_utils::dates::{Clock, SystemClock};
use shared_utils::jwt;

/// In-memory holder of the signed-in session.
///
/// Nothing is written to disk; a process restart signs the user out.
pub struct SessionStore {
    inner: RwLock<Option<Session>>,
    clock: Arc<dyn Clock>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(None),
            clock,
        }
    }

    pub fn establish(&self, session: Session) {
        info!("Session established for user {}", session.user.id);
        *self.write() = Some(session);
    }

    pub fn clear(&self) {
        if self.write().take().is_some() {
            info!("Session cleared");
        }
    }

    /// Apply a change to the signed-in user. No-op when signed out.
    pub fn update_user<F>(&self, update: F)
    where
        F: FnOnce(&mut User),
    {
        match self.write().as_mut() {
            Some(session) => {
                update(&mut session.user);
                debug!("Session user {} updated", session.user.id);
            }
            None => debug!("Ignoring user update without a session"),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<Session>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SessionProvider for SessionStore {
    fn token(&self) -> Option<String> {
        let guard = self.read();
        let session = guard.as_ref()?;

        if jwt::is_expired(&session.token, self.clock.now()) {
            warn!("Session token for user {} has expired", session.user.id);
            return None;
        }

        Some(session.token.clone())
    }

    fn current_user(&self) -> Option<User> {
        self.read().as_ref().map(|session| session.user.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use shared_utils::dates::FixedClock;
    use shared_utils::test_utils::{JwtTestUtils, TestUser};

    const SECRET: &str = "session-test-secret";

    #[test]
    fn test_empty_store_has_no_token() {
        let store = SessionStore::new();
        assert!(store.token().is_none());
        assert!(store.current_user().is_none());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_establish_and_clear() {
        let store = SessionStore::new();
        let user = TestUser::patient("ada@example.com");
        let session = user.session(SECRET);
        let token = session.token.clone();

        store.establish(session);
        assert_eq!(store.token(), Some(token));
        assert_eq!(store.current_user().map(|u| u.id), Some(user.id));

        store.clear();
        assert!(store.token().is_none());
    }

    #[test]
    fn test_expired_token_is_withheld() {
        let store = SessionStore::new();
        let user = TestUser::patient("ada@example.com");
        store.establish(Session {
            token: JwtTestUtils::create_expired_token(&user, SECRET),
            user: user.to_user(),
        });

        assert!(store.token().is_none());
        assert!(store.current_user().is_some());
    }

    #[test]
    fn test_expiry_follows_injected_clock() {
        let user = TestUser::patient("ada@example.com");
        let later = FixedClock(Utc::now() + Duration::hours(48));
        let store = SessionStore::with_clock(Arc::new(later));
        store.establish(user.session(SECRET));

        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_update_user_merges_into_session() {
        let store = SessionStore::new();
        store.update_user(|u| u.name = "ignored".to_string());
        assert!(store.current_user().is_none());

        store.establish(TestUser::patient("ada@example.com").session(SECRET));
        store.update_user(|u| u.name = "Ada Lovelace".to_string());

        assert_eq!(store.current_user().unwrap().name, "Ada Lovelace");
    }
}
