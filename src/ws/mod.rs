//! WebSocket layer: upgrade handler and per-connection tasks.
//!
//! The endpoint at `/ws` streams a JSON document for every new block.
//! Each connection is a hub subscriber with its own bounded queue.

pub mod connection;
pub mod handler;
