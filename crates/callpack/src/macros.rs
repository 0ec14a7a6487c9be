//! Macros for the fixed-width scalars and argument tuples.

/// Defines the native scalar types supported by the format.
/// Arguments passed to callback:
/// 1. Rust Type
/// 2. Width in bytes
macro_rules! for_each_native {
    ($m:ident) => {
        $m!(i8, 1);
        $m!(u8, 1);
        $m!(i16, 2);
        $m!(u16, 2);
        $m!(i32, 4);
        $m!(u32, 4);
        $m!(i64, 8);
        $m!(u64, 8);
        $m!(f32, 4);
        $m!(f64, 8);
    };
}

/// Generates `Pack` for a native scalar using its in-memory byte order.
/// The width written and the width read come from the same `$size`.
macro_rules! impl_pack_native {
    ($ty:ty, $size:expr) => {
        impl crate::traits::Pack for $ty {
            #[inline]
            fn pack(&self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_ne_bytes());
            }

            #[inline]
            fn unpack(cursor: &mut crate::cursor::Cursor<'_>) -> crate::types::Result<Self> {
                Ok(<$ty>::from_ne_bytes(cursor.read_array::<$size>()?))
            }
        }
    };
}

/// Generates `PackArgs` for a tuple of `Pack` values, packed in order.
macro_rules! impl_pack_args {
    ($($name:ident),+) => {
        impl<$($name: crate::traits::Pack),+> crate::traits::PackArgs for ($($name,)+) {
            #[allow(non_snake_case)]
            fn pack_args(&self, out: &mut Vec<u8>) {
                let ($($name,)+) = self;
                $($name.pack(out);)+
            }
        }
    };
}

pub(crate) use for_each_native;
pub(crate) use impl_pack_native;
pub(crate) use impl_pack_args;
