pub mod convert;
pub mod error;
pub mod moods;
pub mod qna;
pub mod routes;
pub mod spaces;
pub mod state;
pub mod users;

pub use routes::router;
pub use state::{AppState, AppStateInner};
