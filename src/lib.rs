//! Talon - HTTP connection front end
//!
//! A single-threaded, non-blocking TCP front end for HTTP traffic, meant to
//! run behind a reverse proxy that handles TLS and idle timeouts. Talon
//! accepts connections, reads request bytes into one shared buffer, and hands
//! them to an application handler together with byte scanners for locating
//! the end of the header block and an auth token embedded in a cookie.

pub mod config;
pub mod scan;
pub mod server;
pub mod token;
