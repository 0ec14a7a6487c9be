//! # Client Call Helper
//!
//! Every call opens a fresh stream connection, sends one request, performs
//! one receive and closes the connection, whatever the outcome.

use std::time::Duration;

use callpack::Pack;
use callpack::PackArgs;
use callpack::decode;
use callsock::Connection;
use callsock::Protocol;
use tracing::debug;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::request::DELIMITER;
use crate::request::MAX_MESSAGE;
use crate::request::encode_request;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// How long connect attempts are retried.
    pub connect_timeout: Duration,
    /// Bytes read for the reply.
    pub max_reply: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(1),
            max_reply: MAX_MESSAGE,
        }
    }
}

impl ClientConfig {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_reply(mut self, max_reply: usize) -> Self {
        self.max_reply = max_reply;
        self
    }
}

/// Calls functions on one server.
#[derive(Debug, Clone)]
pub struct Client {
    address: String,
    port: u16,
    config: ClientConfig,
}

impl Client {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self::with_config(address, port, ClientConfig::default())
    }

    pub fn with_config(address: impl Into<String>, port: u16, config: ClientConfig) -> Self {
        Self {
            address: address.into(),
            port,
            config,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sends `name(args)` and returns the raw reply, which is never empty.
    pub fn try_call<A: PackArgs>(&self, name: &str, args: &A) -> Result<Vec<u8>> {
        if name.as_bytes().contains(&DELIMITER) {
            return Err(Error::Malformed);
        }

        let request = encode_request(name, &args.to_payload());
        if request.len() > MAX_MESSAGE {
            warn!(function = name, bytes = request.len(), "request exceeds {} bytes and will be cut", MAX_MESSAGE);
        }

        let conn = Connection::new();
        let reply = self.round_trip(&conn, &request);
        conn.close();

        let reply = reply?;
        debug!(function = name, bytes = reply.len(), "call returned");
        Ok(reply)
    }

    fn round_trip(&self, conn: &Connection, request: &[u8]) -> Result<Vec<u8>> {
        conn.open(Protocol::Stream, &self.address, self.port, self.config.connect_timeout)?;
        conn.send(request)?;
        match conn.try_recv(self.config.max_reply) {
            Ok(reply) => Ok(reply),
            Err(callsock::Error::PeerClosed) => Err(Error::EmptyReply),
            Err(e) => Err(e.into()),
        }
    }

    /// Sends `name(args)` and decodes the reply as an `R`.
    pub fn try_call_into<R: Pack, A: PackArgs>(&self, name: &str, args: &A) -> Result<R> {
        let reply = self.try_call(name, args)?;
        let (value, _) = decode::<R>(&reply)?;
        Ok(value)
    }

    /// Returns whether a reply arrived.
    pub fn call<A: PackArgs>(&self, name: &str, args: &A) -> bool {
        match self.try_call(name, args) {
            Ok(_) => true,
            Err(e) => {
                debug!(function = name, error = %e, "call failed");
                false
            }
        }
    }

    /// Writes the decoded reply into `out` and returns true, or leaves `out`
    /// untouched and returns false.
    pub fn call_into<R: Pack, A: PackArgs>(&self, out: &mut R, name: &str, args: &A) -> bool {
        match self.try_call_into::<R, A>(name, args) {
            Ok(value) => {
                *out = value;
                true
            }
            Err(e) => {
                debug!(function = name, error = %e, "call failed");
                false
            }
        }
    }
}

/// Calls `name(args)` on `address:port` and reports whether a reply arrived.
pub fn call<A: PackArgs>(address: &str, port: u16, name: &str, args: A) -> bool {
    Client::new(address, port).call(name, &args)
}

/// Calls `name(args)` on `address:port` and decodes the reply into `out`.
/// On failure `out` is left untouched.
pub fn call_into<R: Pack, A: PackArgs>(address: &str, port: u16, out: &mut R, name: &str, args: A) -> bool {
    Client::new(address, port).call_into(out, name, &args)
}
