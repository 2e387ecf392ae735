use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use uuid::Uuid;

use meow_analytics::DayCalendar;
use meow_types::events::Table;
use meow_types::models::{Space, User};

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::http::HttpBackend;
use crate::realtime::{ChangeFeed, WsChangeFeed};
use crate::refresh::LiveView;
use crate::routes::{Guard, Route, guard};
use crate::session::{Session, SessionState, SessionStore};
use crate::storage::{FileStore, KeyValueStore};

/// Everything a page needs, passed explicitly instead of living in globals.
///
/// Built once at startup, then [`AppContext::init`] restores the session.
/// [`AppContext::logout`] tears the session down; pages opened before it
/// keep running until their [`LiveView`] is dropped.
pub struct AppContext<B, F> {
    backend: Arc<B>,
    feed: Arc<F>,
    session: SessionStore<B>,
    calendar: DayCalendar,
    debounce: Duration,
}

impl AppContext<HttpBackend, WsChangeFeed> {
    /// Context talking to the REST API and gateway named in `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let backend = Arc::new(HttpBackend::new(&config.api_url, config.request_timeout)?);
        let feed = Arc::new(WsChangeFeed::new(&config.gateway_url).with_timeout(config.request_timeout));
        let storage = Box::new(FileStore::open(&config.session_path));

        let calendar = DayCalendar::from_offset_minutes(config.utc_offset_minutes).unwrap_or_else(|| {
            warn!("UTC offset of {} minutes is out of range, using UTC", config.utc_offset_minutes);
            DayCalendar::utc()
        });

        info!("Client configured for {}", config.api_url);
        Ok(Self::new(backend, feed, storage, calendar, config.refresh_debounce))
    }
}

impl<B: Backend, F: ChangeFeed> AppContext<B, F> {
    pub fn new(
        backend: Arc<B>,
        feed: Arc<F>,
        storage: Box<dyn KeyValueStore>,
        calendar: DayCalendar,
        debounce: Duration,
    ) -> Self {
        let session = SessionStore::new(backend.clone(), storage);
        Self {
            backend,
            feed,
            session,
            calendar,
            debounce,
        }
    }

    /// Restore the persisted session. Until this returns the session state
    /// is `Loading` and protected routes wait.
    pub async fn init(&self) -> SessionState {
        self.session.restore().await
    }

    pub fn backend(&self) -> Arc<B> {
        self.backend.clone()
    }

    pub fn feed(&self) -> Arc<F> {
        self.feed.clone()
    }

    pub fn session(&self) -> &SessionStore<B> {
        &self.session
    }

    pub fn current(&self) -> Option<Session> {
        self.session.state().session().cloned()
    }

    pub fn calendar(&self) -> DayCalendar {
        self.calendar
    }

    pub fn login(&self, user: User, space: Space) -> io::Result<()> {
        self.session.login(user, space)
    }

    pub fn logout(&self) {
        info!("Logging out");
        self.session.logout();
    }

    pub fn guard(&self, route: Route) -> Guard {
        guard(route, &self.session.state())
    }

    /// Start a page pipeline that reloads on changes to `tables` of
    /// `space_id`. The first load never waits on the change feed; if
    /// subscribing fails the page still loads, just not live.
    pub fn live<T, L, Fut>(&self, space_id: Uuid, tables: &[Table], load: L) -> LiveView<T>
    where
        T: Clone + Send + Sync + 'static,
        L: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let feed = self.feed.clone();
        let tables = tables.to_vec();
        let attach = async move {
            match feed.subscribe(space_id, &tables).await {
                Ok(sub) => Some(sub),
                Err(e) => {
                    warn!("Live updates for {} unavailable: {}", space_id, e);
                    None
                }
            }
        };
        LiveView::spawn_attaching(load, attach, self.debounce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::storage::MemoryStore;
    use meow_types::api::CreateUserRequest;

    #[test]
    fn from_config_falls_back_to_utc() {
        let mut config = ClientConfig::for_api("http://127.0.0.1:9");
        config.session_path = std::env::temp_dir().join(format!("meow-ctx-{}.json", Uuid::new_v4()));
        config.utc_offset_minutes = 24 * 60 + 1;

        let ctx = AppContext::from_config(&config).unwrap();
        assert_eq!(ctx.calendar(), DayCalendar::utc());
        assert_eq!(ctx.feed().url(), "ws://127.0.0.1:9/gateway");
        assert_eq!(ctx.feed().timeout(), config.request_timeout);
        assert!(ctx.current().is_none());
    }

    #[tokio::test]
    async fn login_opens_protected_routes() {
        let backend = Arc::new(MemoryBackend::new());
        let ctx = AppContext::new(
            backend.clone(),
            backend.clone(),
            Box::new(MemoryStore::new()),
            DayCalendar::utc(),
            Duration::from_millis(10),
        );
        assert_eq!(ctx.guard(Route::Home), Guard::Wait);
        assert_eq!(ctx.init().await, SessionState::LoggedOut);
        assert_eq!(ctx.guard(Route::Home), Guard::Redirect(Route::Join));

        let space = backend.create_space().await.unwrap();
        let user = backend
            .create_user(
                space.id,
                CreateUserRequest {
                    name: "Ana".into(),
                    avatar_color: "#FFB6C1".into(),
                },
            )
            .await
            .unwrap();
        ctx.login(user.clone(), space).unwrap();
        assert_eq!(ctx.guard(Route::Home), Guard::Render);
        assert_eq!(ctx.current().map(|s| s.user.id), Some(user.id));

        ctx.logout();
        assert_eq!(ctx.current(), None);
    }

    #[tokio::test]
    async fn silent_gateway_does_not_block_pages() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let gateway = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let backend = Arc::new(MemoryBackend::new());
        let feed = WsChangeFeed::new(format!("ws://{addr}/gateway")).with_timeout(Duration::from_secs(30));
        let ctx = AppContext::new(
            backend.clone(),
            Arc::new(feed),
            Box::new(MemoryStore::new()),
            DayCalendar::utc(),
            Duration::from_millis(10),
        );
        let space = backend.create_space().await.unwrap();
        let user = backend
            .create_user(
                space.id,
                CreateUserRequest {
                    name: "Ana".into(),
                    avatar_color: "#FFB6C1".into(),
                },
            )
            .await
            .unwrap();
        let session = Session { user, space };

        let page = crate::views::dashboard::open(&ctx, &session);
        let state = tokio::time::timeout(Duration::from_secs(2), page.settled()).await.unwrap();
        assert!(state.ready().is_some());
        gateway.abort();
    }
}
