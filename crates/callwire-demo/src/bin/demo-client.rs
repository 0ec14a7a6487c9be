//! Calls each demo function once and logs the results.

use anyhow::Result;
use callwire::call;
use callwire::call_into;
use callwire_demo::Adt;
use tracing::info;
use tracing::warn;

const HOST: &str = "127.0.0.1";

fn main() -> Result<()> {
    callwire_demo::init_tracing();
    let port = callwire_demo::port()?;

    let mut quotient = 0.0f32;
    if call_into(HOST, port, &mut quotient, "Divide", (3i32, 6i32)) {
        info!(result = quotient, "Divide");
    } else {
        warn!("Divide failed");
    }

    if call(HOST, port, "NoFunction", ()) {
        info!("NoFunction succeeded");
    } else {
        warn!("NoFunction failed");
    }

    let mut sum = 0i32;
    let record = Adt { integer: 123, real: 456.789 };
    if call_into(HOST, port, &mut sum, "TestFunction", (1i32, 2i32, record)) {
        info!(result = sum, "TestFunction");
    } else {
        warn!("TestFunction failed");
    }

    Ok(())
}
