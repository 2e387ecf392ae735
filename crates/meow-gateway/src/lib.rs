//! Realtime change feed: space-scoped fan-out of row change events over websockets.

pub mod connection;
pub mod dispatcher;
