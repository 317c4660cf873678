use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use tracing::{debug, info, warn};

use super::store::{KeyValueStore, MemoryStore, ACCESS_KEY, REFRESH_KEY};
use super::token::{self, Claims};

/// One consistent view of the credentials.
///
/// `identity` is always the decode of `access`: `None` when `access` is
/// absent or malformed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub access: Option<String>,
    pub refresh: Option<String>,
    pub identity: Option<Claims>,
}

impl SessionState {
    fn new(access: Option<String>, refresh: Option<String>) -> Self {
        let identity = access.as_deref().and_then(token::decode_claims);
        Self {
            access,
            refresh,
            identity,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access.is_none() && self.refresh.is_none() && self.identity.is_none()
    }
}

/// Process-wide credential store.
///
/// Construct once at startup with [`Session::load`] and share it behind an
/// `Arc`. State is replaced as a whole on every write so readers never
/// observe an access token paired with another token's identity. None of the
/// methods return errors: persistence failures are logged and the in-memory
/// state stays authoritative for the running process.
pub struct Session {
    state: RwLock<Arc<SessionState>>,
    store: Box<dyn KeyValueStore>,
}

impl Session {
    /// Read persisted credentials, if any.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        let access = read_key(store.as_ref(), ACCESS_KEY);
        let refresh = read_key(store.as_ref(), REFRESH_KEY);
        let state = SessionState::new(access, refresh);
        debug!(
            has_access = state.access.is_some(),
            has_refresh = state.refresh.is_some(),
            has_identity = state.identity.is_some(),
            "Session loaded"
        );

        Self {
            state: RwLock::new(Arc::new(state)),
            store,
        }
    }

    /// Session with nothing persisted between runs.
    pub fn in_memory() -> Self {
        Self::load(Box::new(MemoryStore::new()))
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        match self.state.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    pub fn current_access(&self) -> Option<String> {
        self.snapshot().access.clone()
    }

    pub fn current_refresh(&self) -> Option<String> {
        self.snapshot().refresh.clone()
    }

    pub fn identity(&self) -> Option<Claims> {
        self.snapshot().identity.clone()
    }

    /// Whether `credential` decodes and has not expired.
    pub fn is_valid(&self, credential: &str) -> bool {
        token::is_valid(credential)
    }

    /// Access credential present and not expired
    pub fn is_authenticated(&self) -> bool {
        self.current_access()
            .map(|access| self.is_valid(&access))
            .unwrap_or(false)
    }

    /// Access credential if it is currently usable as a bearer token.
    pub fn valid_access(&self) -> Option<String> {
        self.current_access().filter(|access| self.is_valid(access))
    }

    /// `Bearer <access>` for whatever access credential is stored, expired or not.
    pub fn auth_header(&self) -> Option<String> {
        self.current_access().map(|access| format!("Bearer {}", access))
    }

    /// Replace the access credential, keeping the refresh credential.
    ///
    /// The refresh credential is read under the same write lock, so a
    /// concurrent `clear()` is never undone.
    pub fn set_access(&self, access: &str) {
        let state = {
            let mut guard = self.write_state();
            let state = Arc::new(SessionState::new(
                Some(access.to_string()),
                guard.refresh.clone(),
            ));
            *guard = Arc::clone(&state);
            state
        };
        if state.identity.is_none() {
            warn!("Access credential could not be decoded; identity cleared");
        }
        self.persist(ACCESS_KEY, access);
    }

    /// Replace both credentials.
    pub fn set_session(&self, access: &str, refresh: &str) {
        let state = SessionState::new(Some(access.to_string()), Some(refresh.to_string()));
        if state.identity.is_none() {
            warn!("Access credential could not be decoded; identity cleared");
        }
        self.replace(state);
        self.persist(ACCESS_KEY, access);
        self.persist(REFRESH_KEY, refresh);
    }

    /// Forget both credentials and the identity. Safe to call repeatedly.
    pub fn clear(&self) {
        let was_empty = self.snapshot().is_empty();
        self.replace(SessionState::default());
        for key in [ACCESS_KEY, REFRESH_KEY] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to remove persisted credential");
            }
        }
        if !was_empty {
            info!("Session cleared");
        }
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, Arc<SessionState>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace(&self, state: SessionState) {
        *self.write_state() = Arc::new(state);
    }

    fn persist(&self, key: &str, value: &str) {
        if let Err(e) = self.store.set(key, value) {
            warn!(key, error = %e, "Failed to persist credential");
        }
    }
}

fn read_key(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value.filter(|v| !v.is_empty()),
        Err(e) => {
            warn!(key, error = %e, "Failed to read persisted credential");
            None
        }
    }
}
