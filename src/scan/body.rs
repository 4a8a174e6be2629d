const CR: u8 = b'\r';
const LF: u8 = b'\n';

/// Finds the offset where the request body begins, i.e. one past the blank
/// line (`\r\n\r\n`) that terminates the header block.
///
/// Scans backward from the end of the buffer over two-byte-aligned pairs.
/// An aligned `\r\n` pair is a terminator if the pair before it is also
/// `\r\n`; an unaligned terminator shows up as an aligned `\n\r` pair and is
/// confirmed by the single bytes on either side of it.
///
/// Returns `None` if no terminator lies within the buffer. The caller decides
/// whether to wait for more data or reject the request once its header-size
/// policy is exceeded; no limit is enforced here.
pub fn find_body_start(buf: &[u8]) -> Option<usize> {
    let pairs = buf.len() / 2;

    for i in (0..pairs).rev() {
        let at = i * 2;

        if buf[at] == CR && buf[at + 1] == LF {
            // Aligned: terminator is this pair plus the pair before it.
            if at >= 2 && buf[at - 2] == CR && buf[at - 1] == LF {
                return Some(at + 2);
            }
        } else if buf[at] == LF && buf[at + 1] == CR {
            // Unaligned: terminator straddles this pair, spanning at-1..at+3.
            if at >= 1 && at + 2 < buf.len() && buf[at - 1] == CR && buf[at + 2] == LF {
                return Some(at + 3);
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_aligned_terminator() {
        // Terminator at 2..6, body starts at 6.
        let buf = b"ab\r\n\r\nrest";
        assert_eq!(find_body_start(buf), Some(6));
    }

    #[test]
    fn finds_unaligned_terminator() {
        let buf = b"GET / HTTP/1.1\r\nHost: a\r\n\r\n";
        assert_eq!(find_body_start(buf), Some(27));
    }

    #[test]
    fn missing_terminator() {
        assert_eq!(find_body_start(b"GET / HTTP/1.1\r\nHost: a\r\n"), None);
        assert_eq!(find_body_start(b""), None);
        assert_eq!(find_body_start(b"\r\n\r"), None);
    }

    #[test]
    fn terminator_at_buffer_end() {
        let buf = b"a: b\r\n\r\n";
        assert_eq!(find_body_start(buf), Some(8));
    }
}
