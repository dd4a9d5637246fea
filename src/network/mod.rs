//! Network Module
//!
//! TCP server and client handling.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections (fed through a bounded channel)
//! - Commands routed through Store

mod connection;
mod server;

pub use connection::Connection;
pub use server::Server;
