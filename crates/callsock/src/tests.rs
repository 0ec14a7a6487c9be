use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use super::Connection;
use super::DEFAULT_RECV_SIZE;
use super::Error;
use super::Protocol;
use super::Result;
use super::Role;
use super::State;

type R<T> = Result<T>;

const TIMEOUT: Duration = Duration::from_secs(1);

fn stream_listener() -> R<Connection> {
    let listener = Connection::new();
    listener.host(Protocol::Stream, 0)?;
    Ok(listener)
}

/// A port nothing is listening on, as far as this process can tell.
fn free_port() -> u16 {
    let probe = TcpListener::bind("127.0.0.1:0").unwrap();
    probe.local_addr().unwrap().port()
}

#[test]
fn test_new_is_closed_and_unusable() {
    let conn = Connection::new();
    assert_eq!(conn.state(), State::Closed);
    assert!(!conn.is_usable());
    assert_eq!(conn.protocol(), None);
    assert_eq!(conn.role(), None);
    assert_eq!(conn.local_port(), None);
    assert_eq!(conn.failure(), None);
}

#[test]
fn test_host_ephemeral_port() -> R<()> {
    let listener = stream_listener()?;
    assert!(listener.is_usable());
    assert_eq!(listener.state(), State::Ready);
    assert_eq!(listener.role(), Some(Role::Listener));
    assert_eq!(listener.peer_address(), "0.0.0.0");
    assert_ne!(listener.port(), 0);
    assert_eq!(listener.local_port(), Some(listener.port()));
    Ok(())
}

#[test]
fn test_stream_round_trip() -> R<()> {
    let listener = stream_listener()?;
    let port = listener.port();

    let server = thread::spawn(move || -> R<Vec<u8>> {
        let peer = listener.accept();
        assert!(peer.is_usable());
        assert_eq!(peer.role(), Some(Role::Initiator));
        assert_eq!(peer.peer_address(), "127.0.0.1");
        let got = peer.try_recv(64)?;
        peer.send(b"pong")?;
        peer.close();
        Ok(got)
    });

    let client = Connection::new();
    client.open(Protocol::Stream, "127.0.0.1", port, TIMEOUT)?;
    assert!(client.is_usable());
    assert_eq!(client.connect_timeout(), TIMEOUT);
    assert_eq!(client.port(), port);

    client.send(b"ping")?;
    assert_eq!(client.recv(DEFAULT_RECV_SIZE), b"pong");
    assert_eq!(server.join().unwrap()?, b"ping");

    // The peer is gone, so the next read fails and marks the connection.
    assert!(client.recv(64).is_empty());
    assert_eq!(client.state(), State::Error);
    assert_eq!(client.failure(), Some(Error::PeerClosed));
    assert!(!client.is_usable());
    Ok(())
}

#[test]
fn test_close_is_shared_by_clones() -> R<()> {
    let listener = stream_listener()?;
    let copy = listener.clone();
    assert!(copy.same_socket(&listener));

    copy.close();
    assert_eq!(listener.state(), State::Closed);
    assert!(!listener.is_usable());
    assert_eq!(listener.local_port(), None);

    // Closing twice is harmless.
    listener.close();
    assert_eq!(copy.state(), State::Closed);
    Ok(())
}

#[test]
fn test_close_unblocks_accept() -> R<()> {
    let listener = stream_listener()?;
    let waiting = listener.clone();
    let handle = thread::spawn(move || waiting.try_accept());

    thread::sleep(Duration::from_millis(50));
    listener.close();

    let result = handle.join().unwrap();
    assert!(result.is_err());
    assert!(!listener.is_usable());
    Ok(())
}

#[test]
fn test_open_refused_times_out() {
    let conn = Connection::new();
    let result = conn.open(Protocol::Stream, "127.0.0.1", free_port(), Duration::from_millis(100));
    assert_eq!(result, Err(Error::Timeout));
    assert_eq!(conn.state(), State::Error);
    assert_eq!(conn.failure(), Some(Error::Timeout));
    assert!(!conn.is_usable());
}

#[test]
fn test_open_unresolvable() {
    let conn = Connection::new();
    let result = conn.open(Protocol::Stream, "no such host.invalid", 80, TIMEOUT);
    assert!(matches!(result, Err(Error::Resolve(_))));
    assert_eq!(conn.state(), State::Error);
}

#[test]
fn test_empty_send_is_refused() -> R<()> {
    let listener = stream_listener()?;
    let client = Connection::new();
    client.open(Protocol::Stream, "127.0.0.1", listener.port(), TIMEOUT)?;
    let _peer = listener.accept();

    assert_eq!(client.send(b""), Err(Error::EmptyPayload));
    assert_eq!(client.state(), State::Error);
    assert!(!client.is_usable());
    Ok(())
}

#[test]
fn test_unusable_operations() {
    let conn = Connection::new();
    assert_eq!(conn.send(b"x"), Err(Error::NotUsable));
    assert_eq!(conn.try_recv(8), Err(Error::NotUsable));
    assert!(conn.recv(8).is_empty());
    assert!(!conn.accept().is_usable());
    // Failing on an unusable connection does not invent a failure.
    assert_eq!(conn.state(), State::Closed);
}

#[test]
fn test_listener_cannot_send() -> R<()> {
    let listener = stream_listener()?;
    assert_eq!(listener.send(b"x"), Err(Error::WrongProtocol));
    assert_eq!(listener.state(), State::Error);
    Ok(())
}

#[test]
fn test_datagram_exchange() -> R<()> {
    let host = Connection::new();
    host.host(Protocol::Datagram, 0)?;
    assert!(host.is_usable());
    assert_eq!(host.role(), Some(Role::Listener));

    let client = Connection::new();
    client.open(Protocol::Datagram, "127.0.0.1", host.port(), TIMEOUT)?;
    assert!(client.is_usable());
    assert_eq!(client.protocol(), Some(Protocol::Datagram));

    client.send(b"hello")?;
    let (got, sender) = host.recv_from(64)?;
    assert_eq!(got, b"hello");
    assert_eq!(Some(sender.port()), client.local_port());

    host.send_to(b"back", sender)?;
    assert_eq!(client.recv(64), b"back");

    // A hosted datagram socket has no default peer.
    assert_eq!(host.send(b"x"), Err(Error::WrongProtocol));
    Ok(())
}

#[test]
fn test_reopen_resets_metadata() -> R<()> {
    let a = stream_listener()?;
    let b = stream_listener()?;

    let client = Connection::new();
    client.open(Protocol::Stream, "127.0.0.1", a.port(), TIMEOUT)?;
    assert_eq!(client.port(), a.port());

    client.open(Protocol::Stream, "127.0.0.1", b.port(), TIMEOUT)?;
    assert_eq!(client.port(), b.port());
    assert!(client.is_usable());
    Ok(())
}
