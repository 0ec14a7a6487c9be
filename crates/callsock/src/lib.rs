//! # Callsock
//!
//! One OS socket behind a uniform, blocking interface.
//!
//! ## Philosophy
//!
//! - **Explicit State**: Every connection is in exactly one `State`. Whether
//!   it can be used is a pure function of protocol, role and state.
//! - **Shared Handle**: `Connection` is a cheap clone of one underlying
//!   socket. `close` on any clone tears the socket down for all of them, and
//!   the socket is released when the last clone drops.
//! - **Blocking**: `open`, `accept`, `send` and `recv` block the calling
//!   thread. A blocked call is released by closing the connection from
//!   another thread.

pub mod error;
pub mod state;
pub mod connection;

mod endpoint;

pub use error::Error;
pub use error::Result;

pub use state::Protocol;
pub use state::Role;
pub use state::State;

pub use connection::Connection;
pub use connection::DEFAULT_RECV_SIZE;
pub use connection::LISTEN_BACKLOG;
pub use connection::CONNECT_RETRY_PAUSE;

#[cfg(test)]
mod tests;
