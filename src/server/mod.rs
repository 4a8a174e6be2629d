//! Non-blocking connection front end.
//!
//! A single thread drives every connection off one `mio` poll loop with
//! edge-triggered readiness. Each readiness edge must be drained to
//! would-block before the loop moves on, or the edge is lost.
//!
//! # Per-connection write state machine
//!
//! ```text
//!        ┌──────────┐  send() drains synchronously   ┌───────────┐
//!        │   Idle   │ ──────────────────────────────▶│ completed │
//!        └────┬─────┘                                └───────────┘
//!             │ send() hits would-block
//!             ▼
//!        ┌──────────┐  writable edge, more would-block
//!        │ Pending  │ ──────────────┐
//!        └────┬─────┘ ◀─────────────┘
//!             │ writable edge drains the tail
//!             ▼
//!        completion callback; teardown first if close-after-flush
//! ```
//!
//! Reads all land in one process-wide buffer handed to the application
//! handler as a borrowed slice, valid only for that call. Anything the
//! handler wants to keep it must copy out before returning.

pub mod conn;
pub mod gateway;
pub mod listener;
pub mod writer;

pub use conn::ConnId;
pub use gateway::{Gateway, RequestHandler, WriteHandler, WriteOutcome};
pub use listener::Server;
pub use writer::WriteStatus;

/// Capacity of the shared read buffer and of each connection's write scratch
/// buffer. Reading and writing in chunks this large keeps the syscall count
/// down; no single `send` may exceed it.
pub const BUFFER_CAPACITY: usize = 128 * 1024;
