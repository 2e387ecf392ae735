use std::io;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use meow_types::models::{Space, User};

use crate::backend::Backend;
use crate::error::ClientError;
use crate::storage::KeyValueStore;

pub const USER_ID_KEY: &str = "meow_user_id";
pub const SPACE_CODE_KEY: &str = "meow_space_code";

/// The signed-in user and the space they belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub space: Space,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Restore has not finished. Identity is unknown.
    Loading,
    LoggedOut,
    Active(Session),
    /// Persisted identifiers are kept but could not be resolved because the
    /// backend is unreachable. A later restore may succeed.
    Offline {
        user_id: String,
        space_code: String,
        reason: String,
    },
}

impl SessionState {
    pub fn session(&self) -> Option<&Session> {
        match self {
            SessionState::Active(session) => Some(session),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, SessionState::Loading)
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, SessionState::Offline { .. })
    }
}

/// Current identity, restored from persisted identifiers at startup.
/// Observers follow changes through [`SessionStore::watch`].
pub struct SessionStore<B> {
    backend: Arc<B>,
    storage: Box<dyn KeyValueStore>,
    state: watch::Sender<SessionState>,
}

impl<B: Backend> SessionStore<B> {
    pub fn new(backend: Arc<B>, storage: Box<dyn KeyValueStore>) -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { backend, storage, state }
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Resolve the persisted identifiers into a session. Never fails: an
    /// unrecoverable problem clears the identifiers and logs out, while an
    /// unreachable backend keeps them and reports `Offline`.
    pub async fn restore(&self) -> SessionState {
        self.state.send_replace(SessionState::Loading);

        let next = self.resolve().await;
        if matches!(next, SessionState::LoggedOut) {
            self.forget();
        }
        self.state.send_replace(next.clone());
        next
    }

    async fn resolve(&self) -> SessionState {
        let (Some(user_id), Some(space_code)) = (self.storage.get(USER_ID_KEY), self.storage.get(SPACE_CODE_KEY)) else {
            return SessionState::LoggedOut;
        };
        let offline = |err: ClientError| SessionState::Offline {
            user_id: user_id.clone(),
            space_code: space_code.clone(),
            reason: err.to_string(),
        };

        let Ok(id) = user_id.parse::<Uuid>() else {
            warn!("Persisted user id {:?} is not a uuid", user_id);
            return SessionState::LoggedOut;
        };

        let space = match self.backend.get_space_by_code(&space_code).await {
            Ok(space) => space,
            Err(e) if e.is_network() => return offline(e),
            Err(e) => {
                warn!("Dropping session: space {} did not resolve: {}", space_code, e);
                return SessionState::LoggedOut;
            }
        };
        let user = match self.backend.get_user(id).await {
            Ok(user) => user,
            Err(e) if e.is_network() => return offline(e),
            Err(e) => {
                warn!("Dropping session: user {} did not resolve: {}", id, e);
                return SessionState::LoggedOut;
            }
        };

        if user.space_id != space.id {
            warn!("Dropping session: user {} is not in space {}", user.id, space.code);
            return SessionState::LoggedOut;
        }

        info!("Restored session for {} in {}", user.name, space.code);
        SessionState::Active(Session { user, space })
    }

    /// Become `user` in `space` and persist both identifiers.
    pub fn login(&self, user: User, space: Space) -> io::Result<()> {
        let persisted = self
            .storage
            .set(USER_ID_KEY, &user.id.to_string())
            .and_then(|_| self.storage.set(SPACE_CODE_KEY, &space.code));
        self.state.send_replace(SessionState::Active(Session { user, space }));
        persisted
    }

    pub fn logout(&self) {
        self.forget();
        self.state.send_replace(SessionState::LoggedOut);
    }

    fn forget(&self) {
        if let Err(e) = self.storage.clear() {
            warn!("Failed to clear session storage: {}", e);
        }
    }
}
