//! # Error Definitions
//!
//! Every way a connection can fail. The last failure is kept on the
//! connection so callers that only see `is_usable() == false` can still ask why.

use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The address did not resolve to any socket address.
    Resolve(String),
    /// The OS refused to create a socket.
    Create(io::ErrorKind),
    /// Connecting failed with an error that is not retried.
    Connect(io::ErrorKind),
    /// Connecting kept being refused or timing out until the deadline.
    Timeout,
    Bind(io::ErrorKind),
    Listen(io::ErrorKind),
    Accept(io::ErrorKind),
    Send(io::ErrorKind),
    Recv(io::ErrorKind),
    /// The peer closed the stream before any byte arrived.
    PeerClosed,
    /// Sends of zero bytes are refused.
    EmptyPayload,
    /// The operation does not exist for this protocol or role.
    WrongProtocol,
    /// The connection is not in a usable state.
    NotUsable,
    /// The connection was closed while the operation was running.
    Closed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolve(addr) => write!(f, "could not resolve address: {}", addr),
            Self::Create(kind) => write!(f, "socket creation failed: {}", kind),
            Self::Connect(kind) => write!(f, "connect failed: {}", kind),
            Self::Timeout => write!(f, "connect timed out"),
            Self::Bind(kind) => write!(f, "bind failed: {}", kind),
            Self::Listen(kind) => write!(f, "listen failed: {}", kind),
            Self::Accept(kind) => write!(f, "accept failed: {}", kind),
            Self::Send(kind) => write!(f, "send failed: {}", kind),
            Self::Recv(kind) => write!(f, "receive failed: {}", kind),
            Self::PeerClosed => write!(f, "peer closed the connection"),
            Self::EmptyPayload => write!(f, "refusing to send an empty payload"),
            Self::WrongProtocol => write!(f, "operation not supported for this protocol or role"),
            Self::NotUsable => write!(f, "connection is not usable"),
            Self::Closed => write!(f, "connection was closed"),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
