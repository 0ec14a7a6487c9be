use rand::Rng;

use super::Result;
use super::Cursor;
use super::Pack;
use super::PackArgs;
use super::CodecRegistry;
use super::TypeDesc;
use super::encode;
use super::decode;
use crate::types::Error;

type R<T> = Result<T>;

/// Asserts the value survives a trip through the codec and that decode
/// consumed exactly the bytes encode produced.
fn assert_roundtrip<T: Pack + PartialEq + std::fmt::Debug>(value: T) -> R<()> {
    let bytes = encode(&value);
    let (back, consumed) = decode::<T>(&bytes)?;
    assert_eq!(back, value);
    assert_eq!(consumed, bytes.len());
    Ok(())
}

#[test]
fn test_native_widths() {
    assert_eq!(encode(&7i8).len(), 1);
    assert_eq!(encode(&7u8).len(), 1);
    assert_eq!(encode(&7i16).len(), 2);
    assert_eq!(encode(&7u16).len(), 2);
    assert_eq!(encode(&7i32).len(), 4);
    assert_eq!(encode(&7u32).len(), 4);
    assert_eq!(encode(&7i64).len(), 8);
    assert_eq!(encode(&7u64).len(), 8);
    assert_eq!(encode(&7.5f32).len(), 4);
    assert_eq!(encode(&7.5f64).len(), 8);
    assert_eq!(encode(&true).len(), 1);
}

#[test]
fn test_native_byte_order() {
    assert_eq!(encode(&0x01020304i32), 0x01020304i32.to_ne_bytes().to_vec());
    assert_eq!(encode(&2.0f32), 2.0f32.to_ne_bytes().to_vec());
}

#[test]
fn test_random_roundtrip() -> R<()> {
    let mut rng = rand::thread_rng();
    for _ in 0..64 {
        assert_roundtrip(rng.r#gen::<i8>())?;
        assert_roundtrip(rng.r#gen::<u8>())?;
        assert_roundtrip(rng.r#gen::<i16>())?;
        assert_roundtrip(rng.r#gen::<u16>())?;
        assert_roundtrip(rng.r#gen::<i32>())?;
        assert_roundtrip(rng.r#gen::<u32>())?;
        assert_roundtrip(rng.r#gen::<i64>())?;
        assert_roundtrip(rng.r#gen::<u64>())?;
        assert_roundtrip(rng.r#gen::<f32>())?;
        assert_roundtrip(rng.r#gen::<f64>())?;
        assert_roundtrip(rng.r#gen::<bool>())?;
    }
    assert_roundtrip(i32::MIN)?;
    assert_roundtrip(f64::MAX)?;
    assert_roundtrip(f32::NEG_INFINITY)?;
    Ok(())
}

#[test]
fn test_text_takes_remainder() -> R<()> {
    let bytes = encode(&"hello".to_string());
    assert_eq!(bytes, b"hello");

    let (text, consumed) = decode::<String>(&bytes)?;
    assert_eq!(text, "hello");
    assert_eq!(consumed, 5);

    let (empty, consumed) = decode::<String>(&[])?;
    assert_eq!(empty, "");
    assert_eq!(consumed, 0);
    Ok(())
}

#[test]
fn test_text_rejects_bad_utf8() {
    match decode::<String>(&[0xff, 0xfe]) {
        Err(Error::InvalidUtf8) => {}
        other => panic!("Expected InvalidUtf8, got {:?}", other),
    }
}

#[test]
fn test_truncated_decode_fails() {
    match decode::<i64>(&[1, 2, 3]) {
        Err(Error::Truncated { needed: 8, available: 3 }) => {}
        other => panic!("Expected Truncated, got {:?}", other),
    }
    assert!(decode::<f32>(&[]).is_err());
}

#[test]
fn test_pack_args_declaration_order() -> R<()> {
    let payload = (3i32, 6i32, 2.5f64).to_payload();
    assert_eq!(payload.len(), 16);

    let mut cursor = Cursor::new(&payload);
    assert_eq!(i32::unpack(&mut cursor)?, 3);
    assert_eq!(i32::unpack(&mut cursor)?, 6);
    assert_eq!(f64::unpack(&mut cursor)?, 2.5);
    assert!(cursor.is_empty());

    assert!(().to_payload().is_empty());
    Ok(())
}

// ==== REGISTRY TESTS ====

#[derive(Debug, Clone, PartialEq)]
struct Adt {
    integer: i32,
    real: f32,
}

impl Pack for Adt {
    fn pack(&self, out: &mut Vec<u8>) {
        self.integer.pack(out);
        self.real.pack(out);
    }

    fn unpack(cursor: &mut Cursor<'_>) -> Result<Self> {
        Ok(Adt {
            integer: i32::unpack(cursor)?,
            real: f32::unpack(cursor)?,
        })
    }
}

#[test]
fn test_registry_builtins() {
    let registry = CodecRegistry::with_builtins();
    assert_eq!(registry.len(), 12);
    assert!(registry.contains(&TypeDesc::of::<f32>()));
    assert!(registry.contains(&TypeDesc::of::<String>()));
    assert!(!registry.contains(&TypeDesc::of::<Adt>()));
}

#[test]
fn test_registry_decodes_by_descriptor() -> R<()> {
    let registry = CodecRegistry::with_builtins();
    let payload = (1i16, 9u64).to_payload();
    let mut cursor = Cursor::new(&payload);

    let a = registry.decode(&TypeDesc::of::<i16>(), &mut cursor)?;
    assert_eq!(cursor.pos(), 2);
    let b = registry.decode(&TypeDesc::of::<u64>(), &mut cursor)?;
    assert_eq!(cursor.pos(), 10);

    assert_eq!(a.downcast_ref::<i16>(), Some(&1));
    assert_eq!(b.downcast_ref::<u64>(), Some(&9));
    Ok(())
}

#[test]
fn test_registry_missing_codec() {
    let registry = CodecRegistry::with_builtins();
    let mut cursor = Cursor::new(&[0u8; 8]);
    match registry.decode(&TypeDesc::of::<Adt>(), &mut cursor) {
        Err(Error::MissingCodec(name)) => assert!(name.ends_with("Adt")),
        other => panic!("Expected MissingCodec, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_registry_custom_record() -> R<()> {
    let mut registry = CodecRegistry::with_builtins();
    registry.register::<Adt>();

    let value = Adt { integer: 123, real: 456.789 };
    let desc = TypeDesc::of::<Adt>();

    let mut bytes = Vec::new();
    registry.encode(&desc, &value, &mut bytes)?;
    assert_eq!(bytes.len(), 8);

    let mut cursor = Cursor::new(&bytes);
    let back = registry.decode(&desc, &mut cursor)?;
    assert_eq!(back.downcast_ref::<Adt>(), Some(&value));
    assert_eq!(cursor.pos(), bytes.len());
    Ok(())
}

#[test]
fn test_registry_encode_type_mismatch() {
    let registry = CodecRegistry::with_builtins();
    let mut out = Vec::new();
    let result = registry.encode(&TypeDesc::of::<i32>(), &1.0f64, &mut out);
    assert!(matches!(result, Err(Error::TypeMismatch { .. })));
    assert!(out.is_empty());
}
