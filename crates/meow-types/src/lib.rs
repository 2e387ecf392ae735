//! Data model shared by the Meow service, its realtime gateway and clients.

pub mod api;
pub mod events;
pub mod models;
