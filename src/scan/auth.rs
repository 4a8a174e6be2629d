use crate::token::{SENTINEL, TOKEN_LEN};

/// Cookie name length: sixteen repeated sentinel bytes.
pub const COOKIE_NAME_LEN: usize = 16;

/// Bytes a well-formed cookie occupies from the `=` onward: the assignment
/// byte itself plus the full token payload.
const ASSIGNMENT_LEN: usize = 1 + TOKEN_LEN;

const ASSIGN: u8 = b'=';

/// Finds the auth token inside a header block: the offset of the first byte
/// after the `=` of a cookie whose name is exactly sixteen sentinel bytes,
/// with the full token payload still inside the buffer.
///
/// Scans backward for an aligned pair of sentinel bytes, then verifies
/// forward: the sentinel run must end at an `=` preceded by exactly sixteen
/// sentinels, with at least the payload length remaining. On a mismatch the
/// scan skips past the region it already inspected rather than stepping one
/// pair; the stride is short enough that it can never step over a sixteen
/// byte name run. The last well-formed match from the end wins.
///
/// Returns `None` if no such cookie fits in the buffer.
pub fn find_auth_token(buf: &[u8]) -> Option<usize> {
    let pairs = buf.len() / 2;
    let span = ASSIGNMENT_LEN / 2;

    if pairs <= span {
        return None;
    }

    let mut i = (pairs - span) as isize;

    while i > 0 {
        i -= 1;
        let at = i as usize * 2;

        if buf[at] == SENTINEL && buf[at + 1] == SENTINEL && at + 2 >= COOKIE_NAME_LEN {
            // Walk forward to the end of the sentinel run.
            let mut j = at + 2;
            while j < buf.len() {
                match buf[j] {
                    SENTINEL => j += 1,
                    ASSIGN if buf.len() - j >= ASSIGNMENT_LEN => {
                        // Name check: the sixteen bytes before '=' must all
                        // be the sentinel.
                        if buf[j - COOKIE_NAME_LEN..j].iter().all(|&b| b == SENTINEL) {
                            return Some(j + 1);
                        }
                        break;
                    }
                    _ => break,
                }
            }
            // Sentinel pair that was at best part of a cookie value; skip
            // what we just inspected.
            i -= (COOKIE_NAME_LEN / 2 - 1) as isize;
        } else {
            i -= (COOKIE_NAME_LEN / 2 - 2) as isize;
        }
    }

    None
}
