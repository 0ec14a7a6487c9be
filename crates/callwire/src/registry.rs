//! # Function Registry
//!
//! The ordered, immutable table of callable functions plus the codecs their
//! signatures need.
//!
//! ## Invariants
//! - Names are unique. `build` rejects duplicates.
//! - Every parameter and result type of every entry has a codec.
//! - `resolve` returns the first entry with a matching name.
//!
//! The `Registry` is built once and shared read-only, so concurrent
//! dispatch needs no locking. Handlers that capture mutable state must
//! synchronize it themselves.

use std::sync::Arc;

use callpack::Codec;
use callpack::CodecRegistry;
use callpack::Cursor;
use callpack::Pack;
use callpack::Value;
use tracing::debug;

use crate::error::Error;
use crate::error::Result;
use crate::handler::FunctionEntry;
use crate::handler::Handler;

/// Response body of a function without a result.
pub const ACK: &[u8] = b"1";

/// What a successful dispatch sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The function has no result.
    Ack,
    /// The encoded result.
    Value(Vec<u8>),
}

impl Reply {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Reply::Ack => ACK,
            Reply::Value(bytes) => bytes,
        }
    }
}

/// Arguments decoded from a payload, in declaration order.
pub struct Unpacked {
    pub args: Vec<Value>,
    /// Bytes of the payload the arguments occupied. Anything after is ignored.
    pub consumed: usize,
}

/// Assembles a `Registry`.
pub struct RegistryBuilder {
    entries: Vec<FunctionEntry>,
    codecs: CodecRegistry,
}

impl RegistryBuilder {
    /// Starts with the built-in scalar and text codecs.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            codecs: CodecRegistry::with_builtins(),
        }
    }

    /// Makes a `Pack` type usable as a parameter or result.
    pub fn register<T: Pack + Send>(mut self) -> Self {
        self.codecs.register::<T>();
        self
    }

    /// Installs a hand-written codec.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codecs.register_codec(codec);
        self
    }

    /// Adds a function, deriving its signature from the handler.
    pub fn function<Args, H>(self, name: impl Into<String>, handler: H) -> Self
    where
        Args: 'static,
        H: Handler<Args>,
    {
        self.entry(FunctionEntry::new(name, handler))
    }

    /// Adds a prebuilt entry.
    pub fn entry(mut self, entry: FunctionEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validates every entry and freezes the table.
    pub fn build(self) -> Result<Registry> {
        for (i, entry) in self.entries.iter().enumerate() {
            if self.entries[..i].iter().any(|prior| prior.name() == entry.name()) {
                return Err(Error::DuplicateFunction(entry.name().to_string()));
            }

            let result = entry.result();
            for desc in entry.params().iter().chain(result.iter()) {
                if !self.codecs.contains(desc) {
                    return Err(Error::MissingCodec {
                        function: entry.name().to_string(),
                        ty: desc.name(),
                    });
                }
            }
        }

        debug!(functions = self.entries.len(), codecs = self.codecs.len(), "registry built");
        Ok(Registry {
            entries: self.entries,
            codecs: self.codecs,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The frozen function table.
pub struct Registry {
    entries: Vec<FunctionEntry>,
    codecs: CodecRegistry,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn entries(&self) -> &[FunctionEntry] {
        &self.entries
    }

    pub fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    /// Finds the first entry named `name`.
    pub fn resolve(&self, name: &str) -> Option<&FunctionEntry> {
        self.entries.iter().find(|entry| entry.name() == name)
    }

    /// Decodes one argument per declared parameter, walking the payload
    /// with a single cursor. Fails on the first parameter that does not fit.
    pub fn unpack(&self, entry: &FunctionEntry, payload: &[u8]) -> Result<Unpacked> {
        let mut cursor = Cursor::new(payload);
        let mut args = Vec::with_capacity(entry.params().len());

        for desc in entry.params() {
            args.push(self.codecs.decode(desc, &mut cursor)?);
        }

        Ok(Unpacked {
            args,
            consumed: cursor.pos(),
        })
    }

    /// Resolves, unpacks, invokes and encodes. The handler only runs if
    /// every argument decoded.
    pub fn respond(&self, name: &str, payload: &[u8]) -> Result<Reply> {
        let entry = self
            .resolve(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;

        let Unpacked { args, consumed } = self.unpack(entry, payload)?;
        debug!(function = name, args = args.len(), consumed, "invoking");

        let Some(desc) = entry.result() else {
            entry.invoke(args)?;
            return Ok(Reply::Ack);
        };

        let value = entry
            .invoke(args)?
            .ok_or(Error::ResultType { expected: desc.name() })?;

        let mut out = Vec::new();
        self.codecs.encode(&desc, &*value, &mut out)?;
        Ok(Reply::Value(out))
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("entries", &self.entries)
            .field("codecs", &self.codecs)
            .finish()
    }
}
