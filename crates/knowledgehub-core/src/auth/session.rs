use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, warn};

use super::store::{MemoryTokenStore, StorageKey, TokenStore};
use crate::models::UserProfile;

/// Point-in-time copy of the session.
#[derive(Clone, Default, PartialEq)]
pub struct SessionData {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub user: Option<UserProfile>,
}

impl SessionData {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

// Tokens are credentials; only report whether they are present
impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("has_access_token", &self.access_token.is_some())
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("user", &self.user)
            .finish()
    }
}

/// The client's authentication state, mirrored to a `TokenStore`.
///
/// Shared by reference (`Arc<Session>`) between the HTTP layer and the rest
/// of the application. All mutation goes through the methods below; each
/// one updates memory first and then writes through to the store. Store
/// failures are logged and do not fail the in-memory update.
pub struct Session {
    store: Arc<dyn TokenStore>,
    state: RwLock<SessionData>,
}

impl Session {
    /// Load whatever the store holds. Unreadable entries are treated as absent.
    pub fn restore(store: Arc<dyn TokenStore>) -> Self {
        let access_token = read_key(store.as_ref(), StorageKey::AccessToken);
        let refresh_token = read_key(store.as_ref(), StorageKey::RefreshToken);
        let user = read_key(store.as_ref(), StorageKey::User).and_then(|json| {
            serde_json::from_str::<UserProfile>(&json)
                .map_err(|e| warn!(error = %e, "Discarding unreadable stored user profile"))
                .ok()
        });

        let state = SessionData {
            access_token,
            refresh_token,
            user,
        };
        debug!(session = ?state, "Session restored");

        Self {
            store,
            state: RwLock::new(state),
        }
    }

    /// A session that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::restore(Arc::new(MemoryTokenStore::new()))
    }

    pub fn snapshot(&self) -> SessionData {
        self.read().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated()
    }

    /// Record a successful login
    pub fn start(&self, access_token: &str, refresh_token: &str, user: Option<UserProfile>) {
        {
            let mut state = self.write();
            state.access_token = non_empty(access_token);
            state.refresh_token = non_empty(refresh_token);
            state.user = user.clone();
        }
        self.persist(StorageKey::AccessToken, Some(access_token));
        self.persist(StorageKey::RefreshToken, Some(refresh_token));
        self.persist_user(user.as_ref());
    }

    pub fn set_access_token(&self, token: &str) {
        self.write().access_token = non_empty(token);
        self.persist(StorageKey::AccessToken, Some(token));
    }

    pub fn set_refresh_token(&self, token: &str) {
        self.write().refresh_token = non_empty(token);
        self.persist(StorageKey::RefreshToken, Some(token));
    }

    pub fn set_user(&self, user: UserProfile) {
        self.write().user = Some(user.clone());
        self.persist_user(Some(&user));
    }

    /// Forget everything. Calling this on an empty session is a no-op.
    pub fn clear(&self) {
        *self.write() = SessionData::default();
        if let Err(e) = self.store.clear() {
            warn!(error = %e, "Failed to clear token store");
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionData> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, SessionData> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, key: StorageKey, value: Option<&str>) {
        let result = match value.filter(|v| !v.is_empty()) {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        if let Err(e) = result {
            warn!(key = key.as_str(), error = %e, "Failed to persist session value");
        }
    }

    fn persist_user(&self, user: Option<&UserProfile>) {
        match user.map(serde_json::to_string).transpose() {
            Ok(json) => self.persist(StorageKey::User, json.as_deref()),
            Err(e) => warn!(error = %e, "Failed to serialize user profile"),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn read_key(store: &dyn TokenStore, key: StorageKey) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            warn!(key = key.as_str(), error = %e, "Failed to read session value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRole;

    fn store_with(entries: &[(StorageKey, &str)]) -> Arc<MemoryTokenStore> {
        let store = Arc::new(MemoryTokenStore::new());
        for (key, value) in entries {
            store.set(*key, value).unwrap();
        }
        store
    }

    #[test]
    fn test_restore_from_store() {
        let store = store_with(&[
            (StorageKey::AccessToken, "A1"),
            (StorageKey::RefreshToken, "R1"),
            (StorageKey::User, r#"{"id":7,"user_type":"admin"}"#),
        ]);

        let session = Session::restore(store);
        assert!(session.is_authenticated());
        assert_eq!(session.access_token().as_deref(), Some("A1"));
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(session.user().and_then(|u| u.user_type), Some(UserRole::Admin));
    }

    #[test]
    fn test_restore_empty_and_corrupt_values() {
        let store = store_with(&[
            (StorageKey::AccessToken, ""),
            (StorageKey::RefreshToken, "R1"),
            (StorageKey::User, "{not json"),
        ]);

        let session = Session::restore(store);
        assert!(!session.is_authenticated());
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert!(session.user().is_none());
    }

    #[test]
    fn test_start_writes_through() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::restore(store.clone());

        let user = UserProfile {
            id: Some(7),
            ..Default::default()
        };
        session.start("A1", "R1", Some(user));

        assert_eq!(store.get(StorageKey::AccessToken).unwrap().as_deref(), Some("A1"));
        assert_eq!(store.get(StorageKey::RefreshToken).unwrap().as_deref(), Some("R1"));
        assert_eq!(store.get(StorageKey::User).unwrap().as_deref(), Some(r#"{"id":7}"#));

        // A second session over the same store sees the same state
        let reloaded = Session::restore(store);
        assert_eq!(reloaded.snapshot(), session.snapshot());
    }

    #[test]
    fn test_set_access_token_keeps_refresh_token() {
        let store = store_with(&[
            (StorageKey::AccessToken, "A1"),
            (StorageKey::RefreshToken, "R1"),
        ]);
        let session = Session::restore(store.clone());

        session.set_access_token("A2");
        assert_eq!(session.access_token().as_deref(), Some("A2"));
        assert_eq!(session.refresh_token().as_deref(), Some("R1"));
        assert_eq!(store.get(StorageKey::AccessToken).unwrap().as_deref(), Some("A2"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let store = store_with(&[
            (StorageKey::AccessToken, "A1"),
            (StorageKey::RefreshToken, "R1"),
            (StorageKey::User, r#"{"id":7}"#),
        ]);
        let session = Session::restore(store.clone());

        session.clear();
        session.clear();

        assert_eq!(session.snapshot(), SessionData::default());
        for key in StorageKey::ALL {
            assert_eq!(store.get(key).unwrap(), None);
        }
    }

    #[test]
    fn test_debug_hides_tokens() {
        let data = SessionData {
            access_token: Some("secret-access".to_string()),
            refresh_token: None,
            user: None,
        };
        let debug = format!("{:?}", data);
        assert!(!debug.contains("secret-access"));
        assert!(debug.contains("has_access_token: true"));
    }
}
