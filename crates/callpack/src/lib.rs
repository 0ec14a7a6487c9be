//! # Callpack
//!
//! Fixed-width marshalling of typed values to raw bytes and back.
//!
//! ## Format
//!
//! - **Numbers**: the value's native in-memory bytes at its declared width
//!   (`i8`/`u8` = 1, `i16`/`u16` = 2, `i32`/`u32`/`f32` = 4, `i64`/`u64`/`f64` = 8).
//! - **Bool**: one byte, `0` or `1`.
//! - **Text**: the raw UTF-8 bytes with no length prefix. Decoding text takes
//!   the remainder of the buffer, so text only works as the last field.
//!   An empty string encodes to zero bytes. Sockets refuse empty sends, so a
//!   remote function whose result encodes to nothing always fails its call.
//!
//! There is no tagging and no framing: the reader must know the type sequence.
//! Every decode reports how many bytes it consumed through the `Cursor`.

mod macros;

pub mod types;
pub mod cursor;
pub mod traits;
pub mod registry;

pub use types::Result;
pub use types::Error;
pub use types::TypeDesc;

pub use cursor::Cursor;

pub use traits::Pack;
pub use traits::PackArgs;
pub use traits::encode;
pub use traits::decode;

pub use registry::Codec;
pub use registry::CodecRegistry;
pub use registry::PackCodec;
pub use registry::Value;

#[cfg(test)]
mod tests;
