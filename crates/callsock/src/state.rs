//! # Connection State Machine
//!
//! ```text
//! Closed -> Resolving -> SocketCreated -> Connecting -> Ready
//!                                      \-> Binding    -> Ready
//! (Resolving | SocketCreated | Connecting | Binding | Ready) -> Error
//! any -> Closed
//! ```
//!
//! Accepted connections are born `Ready`.

/// Transport flavour of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    /// TCP.
    Stream,
    /// UDP.
    Datagram,
}

/// Which side of the exchange a connection plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Bound to a local port, waiting for peers.
    Listener,
    /// Talking to one peer. Accepted connections are initiators too.
    Initiator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum State {
    #[default]
    Closed,
    Resolving,
    SocketCreated,
    Connecting,
    Binding,
    Ready,
    Error,
}

impl State {
    /// Returns whether `self -> next` is an edge of the state machine.
    pub fn can_advance_to(self, next: State) -> bool {
        use State::*;
        match (self, next) {
            (_, Closed) => true,
            (Closed, Resolving) => true,
            (Resolving, SocketCreated) => true,
            (SocketCreated, Connecting) | (SocketCreated, Binding) => true,
            (Connecting, Ready) | (Binding, Ready) => true,
            (Resolving | SocketCreated | Connecting | Binding | Ready, Error) => true,
            _ => false,
        }
    }

    /// Returns whether an open or host attempt is still running.
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            State::Resolving | State::SocketCreated | State::Connecting | State::Binding
        )
    }
}

/// The usability table. Only a `Ready` connection with a known protocol and
/// role can be used; every other combination must be discarded.
pub fn is_usable(protocol: Option<Protocol>, role: Option<Role>, state: State) -> bool {
    match (protocol, role, state) {
        (Some(Protocol::Stream), Some(Role::Listener), State::Ready) => true,
        (Some(Protocol::Stream), Some(Role::Initiator), State::Ready) => true,
        (Some(Protocol::Datagram), Some(Role::Listener), State::Ready) => true,
        (Some(Protocol::Datagram), Some(Role::Initiator), State::Ready) => true,
        _ => false,
    }
}
