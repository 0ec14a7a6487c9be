//! # Dispatch
//!
//! Runs one request against a `Registry` and answers on the connection it
//! arrived on. Every failure closes the connection without a response,
//! including a handler that panics.

use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;

use callsock::Connection;
use tracing::debug;
use tracing::warn;

use crate::error::Result;
use crate::registry::Registry;
use crate::request::split_request;

/// Answers `name(payload)` on `conn`.
///
/// Returns true when a response was sent and the connection is still
/// usable. On any failure, including an unknown name or a panicking
/// handler, nothing is sent and the connection is closed.
pub fn dispatch(registry: &Registry, conn: &Connection, name: &str, payload: &[u8]) -> bool {
    let outcome = catch_unwind(AssertUnwindSafe(|| try_dispatch(registry, conn, name, payload)));
    match outcome {
        Ok(Ok(())) => conn.is_usable(),
        Ok(Err(e)) => {
            warn!(function = name, error = %e, "dispatch failed");
            conn.close();
            false
        }
        Err(_) => {
            warn!(function = name, "handler panicked");
            conn.close();
            false
        }
    }
}

pub fn try_dispatch(registry: &Registry, conn: &Connection, name: &str, payload: &[u8]) -> Result<()> {
    let reply = registry.respond(name, payload)?;
    conn.send(reply.as_bytes())?;
    debug!(function = name, bytes = reply.as_bytes().len(), "replied");
    Ok(())
}

/// The whole life of an accepted connection: one receive, one dispatch,
/// then close. Returns whether a response was sent.
pub fn serve_one(registry: &Registry, conn: &Connection, max_request: usize) -> bool {
    let served = match conn.try_recv(max_request) {
        Ok(bytes) => match split_request(&bytes) {
            Ok(request) => dispatch(registry, conn, request.name, request.payload),
            Err(e) => {
                warn!(peer = %conn.peer_address(), error = %e, "dropping request");
                false
            }
        },
        Err(e) => {
            debug!(peer = %conn.peer_address(), error = %e, "receive failed");
            false
        }
    };

    conn.close();
    served
}
