//! # Callwire Demo
//!
//! The pieces shared by `demo-server` and `demo-client`: the `Adt` record,
//! the function table, the port and logging setup.

use callwire::Cursor;
use callwire::Pack;
use callwire::Registry;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Port used when `CALLWIRE_PORT` is unset.
pub const DEFAULT_PORT: u16 = 7971;

/// A small application record passed by value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adt {
    pub integer: i32,
    pub real: f32,
}

impl Pack for Adt {
    fn pack(&self, out: &mut Vec<u8>) {
        self.integer.pack(out);
        self.real.pack(out);
    }

    fn unpack(cursor: &mut Cursor<'_>) -> callwire::callpack::Result<Self> {
        Ok(Adt {
            integer: i32::unpack(cursor)?,
            real: f32::unpack(cursor)?,
        })
    }
}

impl std::fmt::Display for Adt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.integer, self.real)
    }
}

pub fn no_function() {}

pub fn divide(a: i32, b: i32) -> f32 {
    a as f32 / b as f32
}

/// Logs the record and returns the sum of the integers.
pub fn test_function(a: i32, b: i32, c: Adt) -> i32 {
    info!(record = %c, "TestFunction");
    a + b
}

/// The functions the demo server exposes.
pub fn registry() -> callwire::Result<Registry> {
    Registry::builder()
        .register::<Adt>()
        .function("NoFunction", no_function)
        .function("Divide", divide)
        .function("TestFunction", test_function)
        .build()
}

/// `CALLWIRE_PORT`, or `DEFAULT_PORT`.
pub fn port() -> anyhow::Result<u16> {
    parse_port(std::env::var("CALLWIRE_PORT").ok().as_deref())
}

fn parse_port(value: Option<&str>) -> anyhow::Result<u16> {
    match value {
        None => Ok(DEFAULT_PORT),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid CALLWIRE_PORT '{}': {}", raw, e)),
    }
}

/// Logs at `info` unless `RUST_LOG` says otherwise.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}
