//! # Codec Registry
//!
//! Type-erased codecs keyed by type identity.
//!
//! The dispatch engine only knows a function's parameters as a list of
//! `TypeDesc`s. It walks that list, looks each descriptor up here and decodes
//! one `Value` per parameter. New value types are made marshallable by
//! registering a codec, never by touching the engine.

use std::any::Any;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::traits::Pack;
use crate::types::Error;
use crate::types::Result;
use crate::types::TypeDesc;

/// A decoded value of some registered type.
pub type Value = Box<dyn Any + Send>;

/// Encode/decode pair for one value type.
pub trait Codec: Send + Sync {
    /// The type this codec handles.
    fn desc(&self) -> TypeDesc;

    /// Appends the encoding of `value` to `out`.
    /// Fails with `TypeMismatch` when `value` is not of type `desc()`.
    fn encode(&self, value: &dyn Any, out: &mut Vec<u8>) -> Result<()>;

    /// Decodes one value, advancing the cursor by the bytes consumed.
    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Value>;
}

/// The codec of any `Pack` type.
pub struct PackCodec<T>(PhantomData<fn() -> T>);

impl<T> PackCodec<T> {
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for PackCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pack + Send> Codec for PackCodec<T> {
    fn desc(&self) -> TypeDesc {
        TypeDesc::of::<T>()
    }

    fn encode(&self, value: &dyn Any, out: &mut Vec<u8>) -> Result<()> {
        let value = value.downcast_ref::<T>().ok_or(Error::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: "another type",
        })?;
        value.pack(out);
        Ok(())
    }

    fn decode(&self, cursor: &mut Cursor<'_>) -> Result<Value> {
        Ok(Box::new(T::unpack(cursor)?))
    }
}

/// Lookup table from type identity to codec.
#[derive(Clone)]
pub struct CodecRegistry {
    codecs: HashMap<TypeDesc, Arc<dyn Codec>>,
}

impl CodecRegistry {
    /// An empty registry. Most callers want `with_builtins`.
    pub fn new() -> Self {
        Self {
            codecs: HashMap::new(),
        }
    }

    /// A registry holding codecs for every built-in scalar and `String`.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry
            .register::<i8>()
            .register::<u8>()
            .register::<i16>()
            .register::<u16>()
            .register::<i32>()
            .register::<u32>()
            .register::<i64>()
            .register::<u64>()
            .register::<f32>()
            .register::<f64>()
            .register::<bool>()
            .register::<String>();
        registry
    }

    /// Registers the codec of a `Pack` type, replacing any previous one.
    pub fn register<T: Pack + Send>(&mut self) -> &mut Self {
        self.register_codec(Arc::new(PackCodec::<T>::new()))
    }

    /// Registers a hand-written codec, replacing any previous one for its type.
    pub fn register_codec(&mut self, codec: Arc<dyn Codec>) -> &mut Self {
        self.codecs.insert(codec.desc(), codec);
        self
    }

    pub fn get(&self, desc: &TypeDesc) -> Option<&Arc<dyn Codec>> {
        self.codecs.get(desc)
    }

    pub fn contains(&self, desc: &TypeDesc) -> bool {
        self.codecs.contains_key(desc)
    }

    pub fn len(&self) -> usize {
        self.codecs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codecs.is_empty()
    }

    /// Decodes one value of type `desc` at the cursor.
    pub fn decode(&self, desc: &TypeDesc, cursor: &mut Cursor<'_>) -> Result<Value> {
        let codec = self.get(desc).ok_or(Error::MissingCodec(desc.name()))?;
        codec.decode(cursor)
    }

    /// Encodes `value`, which must be of type `desc`.
    pub fn encode(&self, desc: &TypeDesc, value: &dyn Any, out: &mut Vec<u8>) -> Result<()> {
        let codec = self.get(desc).ok_or(Error::MissingCodec(desc.name()))?;
        codec.encode(value, out)
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.codecs.keys().map(|d| d.name())).finish()
    }
}
