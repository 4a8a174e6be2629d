use std::fmt;

use mio::net::TcpStream;
use mio::{Registry, Token};

use super::gateway::WriteHandler;
use super::BUFFER_CAPACITY;

/// Opaque handle identifying a live connection.
///
/// Handed to the request handler and its write-completion callbacks; only
/// meaningful while the connection is in the table. Slots are reused after
/// teardown.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(pub(crate) usize);

impl ConnId {
    /// Reactor token for this connection. Token 0 belongs to the listener.
    pub(crate) fn token(self) -> Token {
        Token(self.0 + 1)
    }

    pub(crate) fn from_token(token: Token) -> Self {
        ConnId(token.0 - 1)
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Write-side state of a connection: either nothing queued, or exactly one
/// in-flight write parked across a would-block boundary. There is no queue;
/// callers must wait for completion before submitting another write.
pub(crate) enum WriteState {
    Idle,
    Pending(PendingWrite),
}

pub(crate) struct PendingWrite {
    /// Progress through the scratch buffer, `[offset, len)` still unsent.
    pub(crate) offset: usize,
    pub(crate) len: usize,
    pub(crate) close_after_flush: bool,
    pub(crate) on_done: WriteHandler,
}

/// Everything the server tracks for one accepted connection.
pub(crate) struct Connection {
    pub(crate) stream: TcpStream,
    pub(crate) write: WriteState,
    /// Holds the unsent tail of a backpressured write. Owned by this
    /// connection alone and touched only from its own write path.
    pub(crate) scratch: Box<[u8]>,
}

impl Connection {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            write: WriteState::Idle,
            scratch: vec![0u8; BUFFER_CAPACITY].into_boxed_slice(),
        }
    }
}

/// All per-connection state, in one place, keyed by slot.
///
/// A dense vector with a freelist rather than a map: teardown is a single
/// `remove` that takes the stream with it, so an entry can never be half
/// deleted and the descriptor can never outlive its state.
pub(crate) struct ConnectionTable {
    slots: Vec<Option<Connection>>,
    free: Vec<usize>,
}

impl ConnectionTable {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    pub(crate) fn insert(&mut self, conn: Connection) -> ConnId {
        match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(conn);
                ConnId(slot)
            }
            None => {
                self.slots.push(Some(conn));
                ConnId(self.slots.len() - 1)
            }
        }
    }

    pub(crate) fn get_mut(&mut self, id: ConnId) -> Option<&mut Connection> {
        self.slots.get_mut(id.0)?.as_mut()
    }

    pub(crate) fn remove(&mut self, id: ConnId) -> Option<Connection> {
        let conn = self.slots.get_mut(id.0)?.take()?;
        self.free.push(id.0);
        Some(conn)
    }

    /// Closes a connection: removes its entry, deregisters reactor interest,
    /// and drops (closes) the stream. Safe to call for an already-gone id.
    pub(crate) fn teardown(&mut self, registry: &Registry, id: ConnId) {
        if let Some(mut conn) = self.remove(id) {
            let _ = registry.deregister(&mut conn.stream);
            tracing::trace!(conn = %id, "Connection closed");
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }
}
