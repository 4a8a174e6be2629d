use mio::Registry;

use super::conn::{ConnId, ConnectionTable};
use super::writer::{self, WriteStatus};

/// Final outcome of a write, reported to its completion callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Every byte was delivered.
    Done,
    /// The connection failed mid-write and has been torn down.
    Error,
}

/// Callback invoked once a write fully drains or fails. When the write was
/// submitted with flush-then-close, the connection is already gone by the
/// time this runs and the [`ConnId`] must not be used again.
pub type WriteHandler = Box<dyn FnMut(&mut Gateway<'_>, ConnId, WriteOutcome)>;

/// The primitives a request handler may drive a connection with.
///
/// Borrowed for the duration of a single handler or completion-callback
/// invocation; it cannot be stored, which keeps all connection mutation on
/// the reactor's call stack.
pub struct Gateway<'a> {
    table: &'a mut ConnectionTable,
    registry: &'a Registry,
}

impl<'a> Gateway<'a> {
    pub(crate) fn new(table: &'a mut ConnectionTable, registry: &'a Registry) -> Self {
        Self { table, registry }
    }

    /// Sends `data`, leaving the connection open for further writes once
    /// `on_done` reports completion.
    ///
    /// `data` must not exceed [`super::BUFFER_CAPACITY`], and no other write
    /// may be in flight on this connection.
    pub fn send(&mut self, id: ConnId, data: &[u8], on_done: WriteHandler) -> WriteStatus {
        writer::start_write(self.table, self.registry, id, data, on_done, false)
    }

    /// Sends `data` and closes the connection the instant it fully drains.
    /// Same size and single-write constraints as [`Gateway::send`].
    pub fn send_and_close(&mut self, id: ConnId, data: &[u8]) -> WriteStatus {
        writer::start_write(self.table, self.registry, id, data, Box::new(|_, _, _| {}), true)
    }

    /// Closes a connection immediately, discarding any pending write without
    /// invoking its completion callback.
    pub fn close(&mut self, id: ConnId) {
        self.table.teardown(self.registry, id);
    }
}

/// Application callback fed by the read path.
///
/// `data` is a view into the shared read buffer, valid only for this call;
/// whether it holds a complete request is the handler's question to answer,
/// by running the [`crate::scan`] functions and either responding, closing,
/// or waiting for the next readable edge. The server does not accumulate
/// bytes across reads.
pub trait RequestHandler {
    fn on_request_data(&mut self, gateway: &mut Gateway<'_>, conn: ConnId, data: &[u8]);
}

impl<F> RequestHandler for F
where
    F: FnMut(&mut Gateway<'_>, ConnId, &[u8]),
{
    fn on_request_data(&mut self, gateway: &mut Gateway<'_>, conn: ConnId, data: &[u8]) {
        self(gateway, conn, data)
    }
}
