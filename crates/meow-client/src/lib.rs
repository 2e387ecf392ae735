//! Client side of Meow: typed backend access, the session store, live
//! change subscriptions and the page view models built on them.

pub mod backend;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod memory;
pub mod realtime;
pub mod refresh;
pub mod routes;
pub mod session;
pub mod storage;
pub mod views;

pub use backend::Backend;
pub use config::ClientConfig;
pub use context::AppContext;
pub use error::{ClientError, Result};
pub use http::HttpBackend;
pub use memory::MemoryBackend;
pub use realtime::{ChangeEvent, ChangeFeed, Subscription, WsChangeFeed};
pub use refresh::{LiveView, PageState, RequestGate};
pub use routes::{Guard, Route};
pub use session::{Session, SessionState, SessionStore};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
