// ABOUTME: Frames newline-delimited records out of arbitrarily chunked bytes.
// ABOUTME: Chunk boundaries from the transport do not line up with record boundaries.

use bytes::{Buf, Bytes, BytesMut};

/// Accumulates chunks and yields complete lines.
///
/// Lines stay raw bytes; decoding is left to the record parser so that invalid
/// UTF-8 surfaces as a malformed record instead of being patched over.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Next complete, non-blank line without its terminator.
    pub fn next_line(&mut self) -> Option<Bytes> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(pos).freeze();
            self.buffer.advance(1);
            if let Some(line) = trimmed(line) {
                return Some(line);
            }
        }
        None
    }

    /// Whatever is left once the input has ended, if it is not blank.
    pub fn finish(&mut self) -> Option<Bytes> {
        trimmed(self.buffer.split().freeze())
    }
}

fn trimmed(line: Bytes) -> Option<Bytes> {
    let start = line.iter().position(|b| !b.is_ascii_whitespace())?;
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace())? + 1;
    Some(line.slice(start..end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_split_across_chunks() {
        let mut framer = LineFramer::new();
        framer.push(b"{\"status\":\"Pul");
        assert_eq!(framer.next_line(), None);
        framer.push(b"ling from x\"}\n{\"id\":");
        assert_eq!(
            framer.next_line().as_deref(),
            Some(&b"{\"status\":\"Pulling from x\"}"[..])
        );
        assert_eq!(framer.next_line(), None);
        framer.push(b"\"a\"}");
        assert_eq!(framer.finish().as_deref(), Some(&b"{\"id\":\"a\"}"[..]));
    }

    #[test]
    fn skips_blank_lines_and_carriage_returns() {
        let mut framer = LineFramer::new();
        framer.push(b"\r\n\n{}\r\n  \n");
        assert_eq!(framer.next_line().as_deref(), Some(&b"{}"[..]));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.finish(), None);
    }

    #[test]
    fn keeps_invalid_utf8_untouched() {
        let mut framer = LineFramer::new();
        framer.push(b"{\"id\":\"a\xffb\"}\n");
        assert_eq!(
            framer.next_line().as_deref(),
            Some(&b"{\"id\":\"a\xffb\"}"[..])
        );
    }
}
