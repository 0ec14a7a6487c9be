//! Cross-thread behavior of shared connections.

use std::thread;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use anyhow::bail;
use callsock::Connection;
use callsock::Error;
use callsock::Protocol;
use callsock::State;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[test]
fn test_close_unblocks_recv_on_clone() -> Result<()> {
    init_tracing();
    let listener = Connection::new();
    listener.host(Protocol::Stream, 0)?;

    let client = Connection::new();
    client.open(Protocol::Stream, "127.0.0.1", listener.port(), Duration::from_secs(1))?;
    let _server = listener.accept();

    let reader = client.clone();
    let handle = thread::spawn(move || reader.try_recv(64));

    thread::sleep(Duration::from_millis(50));
    client.close();

    let Ok(result) = handle.join() else {
        bail!("reader panicked");
    };
    // The reader saw the close, so it reports it instead of a peer failure.
    assert_eq!(result, Err(Error::Closed));
    assert_eq!(client.state(), State::Closed);
    Ok(())
}

#[test]
fn test_open_waits_for_late_listener() -> Result<()> {
    init_tracing();
    let probe = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = probe.local_addr()?.port();
    drop(probe);

    let late = thread::spawn(move || -> callsock::Result<Connection> {
        thread::sleep(Duration::from_millis(100));
        let listener = Connection::new();
        listener.host(Protocol::Stream, port)?;
        Ok(listener)
    });

    let client = Connection::new();
    let started = Instant::now();
    client.open(Protocol::Stream, "127.0.0.1", port, Duration::from_secs(2))?;
    assert!(started.elapsed() >= Duration::from_millis(50));
    assert!(client.is_usable());

    let Ok(listener) = late.join() else {
        bail!("listener thread panicked");
    };
    let peer = listener?.accept();
    assert!(peer.is_usable());
    Ok(())
}

#[test]
fn test_close_cancels_connect() -> Result<()> {
    init_tracing();
    let probe = std::net::TcpListener::bind("127.0.0.1:0")?;
    let port = probe.local_addr()?.port();
    drop(probe);

    let client = Connection::new();
    let opener = client.clone();
    let handle = thread::spawn(move || opener.open(Protocol::Stream, "127.0.0.1", port, Duration::from_secs(5)));

    thread::sleep(Duration::from_millis(50));
    let started = Instant::now();
    client.close();

    let Ok(result) = handle.join() else {
        bail!("opener panicked");
    };
    assert_eq!(result, Err(Error::Closed));
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(client.state(), State::Closed);
    Ok(())
}
