//! Auth token decoding.
//!
//! The token rides in a cookie value located by [`crate::scan::find_auth_token`].
//! Its 74 bytes are laid out as:
//!
//! ```text
//! outer version (1) | mac (32) | inner version (1) | subject (32) | issue time (8)
//! ```
//!
//! The outer byte versions the token format, the inner byte versions the
//! authenticated payload; both must currently be `TOKEN_VERSION`. The mac is
//! HMAC-SHA256 over the inner version, subject, and issue time, keyed by the
//! caller's verification key. Nothing is extracted from an unverified token.
//!
//! Tokens are read in place from the shared request buffer and must be copied
//! out before the handler returns if they are to be kept.

mod mac;

use self::mac::hmac_sha256;

/// Byte the auth cookie's sixteen-byte name repeats.
pub const SENTINEL: u8 = b'Q';

/// Token payload length, from the outer version byte through the timestamp.
pub const TOKEN_LEN: usize = 74;

/// The only token format/payload version currently issued.
pub const TOKEN_VERSION: u8 = 0x41;

const MAC_START: usize = 1;
const INNER_START: usize = 33;
const SUBJECT_START: usize = 34;
const TIME_START: usize = 66;

/// Returns the subject identifier of a verified token, or `None` if the
/// token is truncated, carries an unknown version byte, or fails MAC
/// verification against `key`.
pub fn subject(buf: &[u8], token_start: usize, key: &[u8]) -> Option<[u8; 32]> {
    let token = verified(buf, token_start, key)?;

    let mut subject = [0u8; 32];
    subject.copy_from_slice(&token[SUBJECT_START..TIME_START]);
    Some(subject)
}

/// Returns a verified token's issue time as seconds since the epoch, under
/// the same verification contract as [`subject`].
pub fn issue_time(buf: &[u8], token_start: usize, key: &[u8]) -> Option<u64> {
    let token = verified(buf, token_start, key)?;

    let mut time = [0u8; 8];
    time.copy_from_slice(&token[TIME_START..TOKEN_LEN]);
    Some(u64::from_be_bytes(time))
}

/// Structural and cryptographic checks, in that order. A wrong outer version
/// byte rejects before any further byte is examined.
fn verified<'a>(buf: &'a [u8], token_start: usize, key: &[u8]) -> Option<&'a [u8]> {
    let token = buf.get(token_start..token_start + TOKEN_LEN)?;

    if token[0] != TOKEN_VERSION {
        return None;
    }
    if token[INNER_START] != TOKEN_VERSION {
        return None;
    }

    let expected = hmac_sha256(&token[INNER_START..TOKEN_LEN], key);
    if !constant_time_eq(&expected, &token[MAC_START..INNER_START]) {
        return None;
    }

    Some(token)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Builds a well-formed token for the given subject and issue time, signed
/// with `key`. Issuance normally lives with whatever authenticates users
/// upstream; this is here so tests and tooling can mint tokens.
pub fn seal(subject: &[u8; 32], issue_time: u64, key: &[u8]) -> [u8; TOKEN_LEN] {
    let mut token = [0u8; TOKEN_LEN];
    token[0] = TOKEN_VERSION;
    token[INNER_START] = TOKEN_VERSION;
    token[SUBJECT_START..TIME_START].copy_from_slice(subject);
    token[TIME_START..].copy_from_slice(&issue_time.to_be_bytes());

    let mac = hmac_sha256(&token[INNER_START..], key);
    token[MAC_START..INNER_START].copy_from_slice(&mac);
    token
}
