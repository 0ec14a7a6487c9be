//! The marshalling traits.

use crate::cursor::Cursor;
use crate::macros::for_each_native;
use crate::macros::impl_pack_args;
use crate::macros::impl_pack_native;
use crate::types::Error;
use crate::types::Result;

/// A value with a byte representation.
///
/// `pack` appends the encoding to `out`; `unpack` reads one value starting at
/// the cursor and advances it by exactly the bytes it consumed. For every
/// value `v`, `unpack` must consume as many bytes as `pack(v)` produced.
///
/// Application record types implement this to become marshallable:
///
/// ```
/// use callpack::{Cursor, Pack, Result};
///
/// struct Point { x: i32, y: i32 }
///
/// impl Pack for Point {
///     fn pack(&self, out: &mut Vec<u8>) {
///         self.x.pack(out);
///         self.y.pack(out);
///     }
///
///     fn unpack(cursor: &mut Cursor<'_>) -> Result<Self> {
///         Ok(Point { x: i32::unpack(cursor)?, y: i32::unpack(cursor)? })
///     }
/// }
/// ```
pub trait Pack: Sized + 'static {
    fn pack(&self, out: &mut Vec<u8>);
    fn unpack(cursor: &mut Cursor<'_>) -> Result<Self>;
}

for_each_native!(impl_pack_native);

impl Pack for bool {
    fn pack(&self, out: &mut Vec<u8>) {
        out.push(*self as u8);
    }

    fn unpack(cursor: &mut Cursor<'_>) -> Result<Self> {
        let [b] = cursor.read_array::<1>()?;
        Ok(b != 0)
    }
}

/// Text has no length prefix and swallows the rest of the buffer.
impl Pack for String {
    fn pack(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn unpack(cursor: &mut Cursor<'_>) -> Result<Self> {
        let rest = cursor.as_slice();
        let text = std::str::from_utf8(rest).map_err(|_| Error::InvalidUtf8)?;
        cursor.read_rest();
        Ok(text.to_string())
    }
}

/// Encodes a single value.
pub fn encode<T: Pack>(value: &T) -> Vec<u8> {
    let mut out = Vec::new();
    value.pack(&mut out);
    out
}

/// Decodes a single value from the start of `bytes`.
/// Returns the value and the number of bytes consumed.
pub fn decode<T: Pack>(bytes: &[u8]) -> Result<(T, usize)> {
    let mut cursor = Cursor::new(bytes);
    let value = T::unpack(&mut cursor)?;
    Ok((value, cursor.pos()))
}

/// An ordered argument list, packed back to back in declaration order.
pub trait PackArgs {
    fn pack_args(&self, out: &mut Vec<u8>);

    fn to_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.pack_args(&mut out);
        out
    }
}

impl PackArgs for () {
    fn pack_args(&self, _out: &mut Vec<u8>) {}
}

impl_pack_args!(A);
impl_pack_args!(A, B);
impl_pack_args!(A, B, C);
impl_pack_args!(A, B, C, D);
impl_pack_args!(A, B, C, D, E);
impl_pack_args!(A, B, C, D, E, F);
impl_pack_args!(A, B, C, D, E, F, G);
impl_pack_args!(A, B, C, D, E, F, G, H);
