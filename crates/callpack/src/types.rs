//! Core types for the callpack format

use std::any::TypeId;
use std::hash::Hash;
use std::hash::Hasher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The buffer ended before a fixed-width value could be read.
    Truncated { needed: usize, available: usize },
    /// Text bytes were not valid UTF-8.
    InvalidUtf8,
    /// No codec is registered for the named type.
    MissingCodec(&'static str),
    /// A codec was handed a value of another type.
    TypeMismatch { expected: &'static str, found: &'static str },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Truncated { needed, available } => {
                write!(f, "truncated value: needed {} bytes, {} available", needed, available)
            }
            Error::InvalidUtf8 => write!(f, "text is not valid UTF-8"),
            Error::MissingCodec(name) => write!(f, "no codec registered for {}", name),
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;

/// Identity of a marshallable type.
///
/// Two descriptors are equal when they name the same Rust type; the name is
/// carried along for diagnostics only.
#[derive(Debug, Clone, Copy)]
pub struct TypeDesc {
    id: TypeId,
    name: &'static str,
}

impl TypeDesc {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}
