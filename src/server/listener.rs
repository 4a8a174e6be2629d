use std::io::{self, Read};
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context as _;
use mio::event::Event;
use mio::net::TcpListener;
use mio::{Events, Interest, Poll, Registry, Token};
use tracing::{debug, info, trace};

use super::BUFFER_CAPACITY;
use super::conn::{ConnId, Connection, ConnectionTable, WriteState};
use super::gateway::{Gateway, RequestHandler};
use super::writer;

const LISTENER: Token = Token(0);
const EVENT_BATCH: usize = 256;

/// The front end: one listener, one poll loop, one thread.
///
/// Connections are registered edge-triggered for both readability and
/// writability at accept time and never re-registered; every edge is drained
/// to would-block. All reads land in one shared buffer whose contents are
/// only valid for the handler call they feed.
pub struct Server<H> {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    table: ConnectionTable,
    read_buf: Box<[u8]>,
    handler: H,
}

impl<H: RequestHandler> Server<H> {
    /// Binds the listener and registers it with the reactor.
    pub fn bind(addr: &str, handler: H) -> anyhow::Result<Self> {
        let addr: SocketAddr = addr
            .parse()
            .with_context(|| format!("invalid listen address {addr:?}"))?;

        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, LISTENER, Interest::READABLE)?;
        info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            poll,
            events: Events::with_capacity(EVENT_BATCH),
            listener,
            table: ConnectionTable::new(),
            read_buf: vec![0u8; BUFFER_CAPACITY].into_boxed_slice(),
            handler,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Number of connections currently in the table.
    pub fn connection_count(&self) -> usize {
        self.table.len()
    }

    /// Runs the dispatch loop forever.
    pub fn run(&mut self) -> anyhow::Result<()> {
        loop {
            self.poll_once(None)?;
        }
    }

    /// Waits for readiness edges (up to `timeout`) and dispatches each one.
    pub fn poll_once(&mut self, timeout: Option<Duration>) -> anyhow::Result<()> {
        let Self {
            poll,
            events,
            listener,
            table,
            read_buf,
            handler,
        } = self;

        if let Err(e) = poll.poll(events, timeout) {
            if e.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(e.into());
        }
        let registry = poll.registry();

        for event in events.iter() {
            match event.token() {
                LISTENER => accept_ready(listener, table, registry),
                token => {
                    let id = ConnId::from_token(token);
                    if event.is_readable() {
                        read_ready(table, registry, read_buf, handler, id);
                    }
                    // One event can carry both facets; skipping the writable
                    // half would lose the edge and strand a parked write.
                    // Error conditions land here too, so a failing
                    // connection's write callback gets its outcome.
                    if event.is_writable()
                        || event.is_error()
                        || event.is_write_closed()
                        || event.is_read_closed()
                    {
                        write_ready(table, registry, id, event);
                    }
                }
            }
        }

        Ok(())
    }
}

/// Drains the accept queue for a listener edge. Like every other handle,
/// the listener is edge-triggered, so stopping early would strand whatever
/// arrived while the edge was being handled. Transient accept failures are
/// dropped on the floor; the next arrival re-arms the edge.
fn accept_ready(listener: &TcpListener, table: &mut ConnectionTable, registry: &Registry) {
    loop {
        let (stream, peer) = match listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                trace!(error = %e, "Accept failed");
                return;
            }
        };

        if let Err(e) = stream.set_nodelay(true) {
            trace!(error = %e, "Failed to disable Nagle on accepted connection");
        }

        let id = table.insert(Connection::new(stream));
        let Some(conn) = table.get_mut(id) else {
            return;
        };
        if let Err(e) = registry.register(
            &mut conn.stream,
            id.token(),
            Interest::READABLE | Interest::WRITABLE,
        ) {
            debug!(error = %e, "Failed to register accepted connection");
            table.remove(id);
            continue;
        }

        trace!(conn = %id, peer = %peer, "Accepted connection");
    }
}

/// Read path: drain the connection into the shared buffer, handing each
/// read's bytes to the handler, until would-block. EOF and read errors tear
/// the connection down.
fn read_ready<H: RequestHandler>(
    table: &mut ConnectionTable,
    registry: &Registry,
    read_buf: &mut [u8],
    handler: &mut H,
    id: ConnId,
) {
    loop {
        // Re-looked-up each pass: the handler may have closed it.
        let Some(conn) = table.get_mut(id) else {
            return;
        };
        match conn.stream.read(read_buf) {
            Ok(0) => {
                table.teardown(registry, id);
                return;
            }
            Ok(n) => {
                let mut gateway = Gateway::new(table, registry);
                handler.on_request_data(&mut gateway, id, &read_buf[..n]);
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(conn = %id, error = %e, "Read failed");
                table.teardown(registry, id);
                return;
            }
        }
    }
}

/// Writable-or-error path. With a write parked this resumes it; with nothing
/// queued, a bare writable edge is the expected one following accept, while
/// an error or hangup condition means the peer is gone.
fn write_ready(table: &mut ConnectionTable, registry: &Registry, id: ConnId, event: &Event) {
    let Some(conn) = table.get_mut(id) else {
        return;
    };
    let pending = matches!(conn.write, WriteState::Pending(_));

    if pending {
        writer::resume_write(table, registry, id);
    } else if event.is_error() || event.is_write_closed() || event.is_read_closed() {
        table.teardown(registry, id);
    }
}
