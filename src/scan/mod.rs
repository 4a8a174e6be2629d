//! Byte scanners over raw request data.
//!
//! These are pure functions the application handler runs over the shared
//! read buffer; the server core never invokes them on its own. Both return
//! `None` rather than erroring: a miss is a normal outcome the handler turns
//! into buffer-more, reject, or close.

pub mod auth;
pub mod body;

pub use auth::find_auth_token;
pub use body::find_body_start;
