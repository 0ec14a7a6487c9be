use std::net::Shutdown;
use std::net::TcpListener;
use std::net::TcpStream;
use std::net::UdpSocket;

use socket2::SockRef;

/// The concrete OS socket behind a ready connection.
#[derive(Debug)]
pub(crate) enum Endpoint {
    Listener(TcpListener),
    Stream(TcpStream),
    Datagram(UdpSocket),
}

impl Endpoint {
    fn sock_ref(&self) -> SockRef<'_> {
        match self {
            Endpoint::Listener(l) => SockRef::from(l),
            Endpoint::Stream(s) => SockRef::from(s),
            Endpoint::Datagram(d) => SockRef::from(d),
        }
    }

    /// Shuts the socket down in both directions, waking any thread blocked
    /// in `accept`, `recv` or `send` on it. Errors are ignored: the socket
    /// may already be disconnected.
    pub(crate) fn shutdown(&self) {
        let _ = self.sock_ref().shutdown(Shutdown::Both);
    }

    pub(crate) fn local_port(&self) -> Option<u16> {
        let addr = match self {
            Endpoint::Listener(l) => l.local_addr(),
            Endpoint::Stream(s) => s.local_addr(),
            Endpoint::Datagram(d) => d.local_addr(),
        };
        addr.ok().map(|a| a.port())
    }
}
