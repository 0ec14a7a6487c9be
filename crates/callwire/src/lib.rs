//! # Callwire
//!
//! Remote calls by name over one-shot stream connections.
//!
//! ```text
//! request  := name "\n" payload
//! payload  := pack(arg_1) pack(arg_2) ... pack(arg_n)
//! response := pack(result) | "1"
//! ```
//!
//! A server builds a `Registry` of named handlers once, then runs a `Service`
//! on a port. Every accepted connection carries exactly one request and gets
//! at most one response. Clients use `call` / `call_into`, or a `Client` when
//! they want the structured error instead of a bool.
//!
//! ## Philosophy
//!
//! - **Descriptor Driven**: Handlers are stored type-erased. Arguments are
//!   decoded by walking the declared `TypeDesc`s through the codec registry.
//! - **Fail Closed**: Unknown names, short payloads and bad requests get no
//!   response; the connection is closed and the handler never runs.
//! - **One Thread Per Request**: No pool and no async. `stop` closes every
//!   socket to wake blocked threads, then joins them.

mod macros;

pub mod error;
pub mod handler;
pub mod registry;
pub mod request;
pub mod dispatch;
pub mod service;
pub mod client;

pub use error::Error;
pub use error::Result;

pub use handler::Handler;
pub use handler::FunctionEntry;

pub use registry::Registry;
pub use registry::RegistryBuilder;
pub use registry::Reply;
pub use registry::Unpacked;
pub use registry::ACK;

pub use request::MAX_MESSAGE;
pub use request::Request;
pub use request::encode_request;
pub use request::split_request;

pub use dispatch::dispatch;
pub use dispatch::serve_one;

pub use service::Service;
pub use service::ServiceConfig;

pub use client::Client;
pub use client::ClientConfig;
pub use client::call;
pub use client::call_into;

// Registering a record type means implementing `Pack` for it.
pub use callpack;
pub use callsock;

pub use callpack::Cursor;
pub use callpack::Pack;
pub use callpack::PackArgs;
pub use callpack::TypeDesc;
