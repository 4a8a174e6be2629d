//! A small application handler wired up by `main`.
//!
//! Answers every complete request with an empty 200 after looking for the
//! auth cookie, and rejects oversized header blocks with a 413. Requests
//! whose header block hasn't fully arrived in one read are dropped for the
//! client to retry; buffering partial headers across reads is an application
//! policy this handler doesn't implement.

use talon::scan;
use talon::server::{ConnId, Gateway, RequestHandler};
use talon::token;

const OK_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const TOO_LARGE_RESPONSE: &[u8] =
    b"HTTP/1.1 413 Content Too Large\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

pub struct DemoHandler {
    max_header_bytes: usize,
    key: Vec<u8>,
}

impl DemoHandler {
    pub fn new(max_header_bytes: usize, key: Vec<u8>) -> Self {
        Self {
            max_header_bytes,
            key,
        }
    }
}

impl RequestHandler for DemoHandler {
    fn on_request_data(&mut self, gateway: &mut Gateway<'_>, conn: ConnId, data: &[u8]) {
        let Some(body_start) = scan::find_body_start(data) else {
            if data.len() >= self.max_header_bytes {
                gateway.send_and_close(conn, TOO_LARGE_RESPONSE);
            } else {
                gateway.close(conn);
            }
            return;
        };

        if let Some(token_start) = scan::find_auth_token(&data[..body_start]) {
            match token::subject(data, token_start, &self.key) {
                Some(subject) => {
                    tracing::debug!(conn = %conn, subject = ?subject, "Request carried a verified token")
                }
                None => tracing::debug!(conn = %conn, "Request token failed verification"),
            }
        }

        gateway.send_and_close(conn, OK_RESPONSE);
    }
}
