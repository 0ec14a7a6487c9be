//! Serves `NoFunction`, `Divide` and `TestFunction` until killed.

use anyhow::Result;
use callwire::Service;
use tracing::info;

fn main() -> Result<()> {
    callwire_demo::init_tracing();

    let port = callwire_demo::port()?;
    let service = Service::new(callwire_demo::registry()?);
    let bound = service.try_start(port)?;
    info!(port = bound, "demo server running");

    loop {
        std::thread::park();
    }
}
