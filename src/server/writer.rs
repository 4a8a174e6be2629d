use std::io::{self, Write};

use mio::Registry;
use mio::net::TcpStream;
use tracing::debug;

use super::conn::{ConnId, ConnectionTable, PendingWrite, WriteState};
use super::gateway::{Gateway, WriteHandler, WriteOutcome};

/// What a write submission came to, synchronously.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteStatus {
    /// Fully drained; the completion callback has already run.
    Complete,
    /// Backpressured; the tail is parked and will drain on writable edges,
    /// after which the completion callback runs. Submit nothing further
    /// until then.
    Pending,
    /// The connection is gone; the completion callback got `Error`.
    Failed,
}

enum Flush {
    Drained,
    Blocked(usize),
    Failed,
}

/// Pushes `data[offset..]` into the socket until it is gone or the socket
/// stops taking it.
fn flush(stream: &mut TcpStream, data: &[u8], mut offset: usize) -> Flush {
    loop {
        if offset == data.len() {
            return Flush::Drained;
        }
        match stream.write(&data[offset..]) {
            Ok(0) => return Flush::Failed,
            Ok(n) => offset += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Flush::Blocked(offset),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!(error = %e, "Write failed");
                return Flush::Failed;
            }
        }
    }
}

/// Submits a write on an idle connection.
///
/// Drains as much as the socket takes right now. On would-block the unsent
/// tail is copied into the connection's scratch buffer and the write is
/// parked until writable edges drain it; on a fatal error the connection is
/// torn down and `on_done` hears `Error`. With `close_after_flush` the
/// connection is torn down the moment the final byte drains, before
/// `on_done` runs.
pub(crate) fn start_write(
    table: &mut ConnectionTable,
    registry: &Registry,
    id: ConnId,
    data: &[u8],
    mut on_done: WriteHandler,
    close_after_flush: bool,
) -> WriteStatus {
    let Some(conn) = table.get_mut(id) else {
        let mut gateway = Gateway::new(table, registry);
        on_done(&mut gateway, id, WriteOutcome::Error);
        return WriteStatus::Failed;
    };
    assert!(
        data.len() <= conn.scratch.len(),
        "single write of {} bytes exceeds buffer capacity",
        data.len()
    );
    assert!(
        matches!(conn.write, WriteState::Idle),
        "write submitted while another is in flight on {id}"
    );

    match flush(&mut conn.stream, data, 0) {
        Flush::Drained => {
            if close_after_flush {
                table.teardown(registry, id);
            }
            let mut gateway = Gateway::new(table, registry);
            on_done(&mut gateway, id, WriteOutcome::Done);
            WriteStatus::Complete
        }
        Flush::Blocked(offset) => {
            let tail = data.len() - offset;
            conn.scratch[..tail].copy_from_slice(&data[offset..]);
            conn.write = WriteState::Pending(PendingWrite {
                offset: 0,
                len: tail,
                close_after_flush,
                on_done,
            });
            WriteStatus::Pending
        }
        Flush::Failed => {
            table.teardown(registry, id);
            let mut gateway = Gateway::new(table, registry);
            on_done(&mut gateway, id, WriteOutcome::Error);
            WriteStatus::Failed
        }
    }
}

/// Drives a parked write forward on a writable edge.
///
/// The unsent range already lives in the connection's scratch buffer, so
/// another would-block just records the new offset; nothing is re-copied.
/// No-op if the connection has no write in flight.
pub(crate) fn resume_write(table: &mut ConnectionTable, registry: &Registry, id: ConnId) {
    let Some(conn) = table.get_mut(id) else {
        return;
    };
    let WriteState::Pending(pw) = &mut conn.write else {
        return;
    };

    match flush(&mut conn.stream, &conn.scratch[..pw.len], pw.offset) {
        Flush::Blocked(offset) => {
            pw.offset = offset;
        }
        Flush::Drained => {
            let WriteState::Pending(mut pw) = std::mem::replace(&mut conn.write, WriteState::Idle)
            else {
                return;
            };
            if pw.close_after_flush {
                table.teardown(registry, id);
            }
            let mut gateway = Gateway::new(table, registry);
            (pw.on_done)(&mut gateway, id, WriteOutcome::Done);
        }
        Flush::Failed => {
            let state = std::mem::replace(&mut conn.write, WriteState::Idle);
            table.teardown(registry, id);
            if let WriteState::Pending(mut pw) = state {
                let mut gateway = Gateway::new(table, registry);
                (pw.on_done)(&mut gateway, id, WriteOutcome::Error);
            }
        }
    }
}
