//! # Error Definitions
//!
//! Failures of registration, dispatch and calls. Transport and codec errors
//! from the lower layers are wrapped, not flattened.

use std::io;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// No registered function has this name.
    UnknownFunction(String),
    /// A second function was registered under an existing name.
    DuplicateFunction(String),
    /// A function uses a type that has no codec.
    MissingCodec { function: String, ty: &'static str },
    /// A request had no name line, or the name was not UTF-8.
    Malformed,
    /// A handler was invoked with the wrong number of arguments.
    ArgumentCount { expected: usize, found: usize },
    /// An argument was not of the declared type.
    ArgumentType { index: usize, expected: &'static str },
    /// A handler returned something other than its declared result.
    ResultType { expected: &'static str },
    /// The payload could not be decoded into the declared parameters.
    Decode(callpack::Error),
    Transport(callsock::Error),
    /// The server closed the connection without replying.
    EmptyReply,
    /// The OS refused to start a thread.
    Spawn(io::ErrorKind),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownFunction(name) => write!(f, "unknown function: {}", name),
            Self::DuplicateFunction(name) => write!(f, "function registered twice: {}", name),
            Self::MissingCodec { function, ty } => {
                write!(f, "function '{}' uses {} which has no codec", function, ty)
            }
            Self::Malformed => write!(f, "malformed request"),
            Self::ArgumentCount { expected, found } => {
                write!(f, "expected {} arguments, found {}", expected, found)
            }
            Self::ArgumentType { index, expected } => {
                write!(f, "argument {} is not of type {}", index, expected)
            }
            Self::ResultType { expected } => write!(f, "handler did not return {}", expected),
            Self::Decode(e) => write!(f, "decode error: {}", e),
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::EmptyReply => write!(f, "no reply received"),
            Self::Spawn(kind) => write!(f, "could not spawn thread: {}", kind),
        }
    }
}

impl std::error::Error for Error {}

impl From<callpack::Error> for Error {
    fn from(e: callpack::Error) -> Self {
        Self::Decode(e)
    }
}

impl From<callsock::Error> for Error {
    fn from(e: callsock::Error) -> Self {
        Self::Transport(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
