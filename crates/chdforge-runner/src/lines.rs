//! Line framing for tool output.
//!
//! chdman redraws its progress line with carriage returns, so both `\r` and
//! `\n` terminate a line here. Empty lines are dropped and bytes are decoded
//! lossily, so arbitrary binary output never produces an error.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;

/// Longest line emitted before a forced split.
const DEFAULT_MAX_LINE: usize = 64 * 1024;

/// A [`Decoder`] yielding one `String` per non-empty output line.
#[derive(Debug, Clone)]
pub struct OutputLineCodec {
    max_length: usize,
}

impl OutputLineCodec {
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_LINE,
        }
    }

    /// Split lines longer than `max_length` bytes into several lines.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(1),
        }
    }
}

impl Default for OutputLineCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for OutputLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            match buf.iter().position(|b| *b == b'\n' || *b == b'\r') {
                Some(pos) if pos > self.max_length => {
                    let line = buf.split_to(self.max_length);
                    return Ok(Some(to_line(&line)));
                }
                Some(pos) => {
                    let line = buf.split_to(pos);
                    buf.advance(1);
                    if line.is_empty() {
                        continue;
                    }
                    return Ok(Some(to_line(&line)));
                }
                None if buf.len() >= self.max_length => {
                    let line = buf.split_to(self.max_length);
                    return Ok(Some(to_line(&line)));
                }
                None => return Ok(None),
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        Ok(Some(to_line(&rest)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(input: &[u8]) -> Vec<String> {
        let mut codec = OutputLineCodec::new();
        let mut buf = BytesMut::from(input);
        let mut out = Vec::new();
        while let Some(line) = codec.decode(&mut buf).unwrap() {
            out.push(line);
        }
        while let Some(line) = codec.decode_eof(&mut buf).unwrap() {
            out.push(line);
        }
        out
    }

    #[test]
    fn splits_on_newline_and_carriage_return() {
        let lines = decode_all(b"Compressing, 10% complete\rCompressing, 20% complete\rDone\n");
        assert_eq!(
            lines,
            ["Compressing, 10% complete", "Compressing, 20% complete", "Done"]
        );
    }

    #[test]
    fn skips_empty_lines() {
        assert_eq!(decode_all(b"a\r\n\n\nb\r\n"), ["a", "b"]);
    }

    #[test]
    fn partial_line_waits_for_terminator() {
        let mut codec = OutputLineCodec::new();
        let mut buf = BytesMut::from(&b"half a li"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ne\n");
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("half a line"));
    }

    #[test]
    fn flushes_trailing_line_at_eof() {
        assert_eq!(decode_all(b"first\nno newline"), ["first", "no newline"]);
    }

    #[test]
    fn lossy_on_invalid_utf8() {
        let lines = decode_all(b"ok \xff\xfe 50%\n");
        assert_eq!(lines.len(), 1);
        assert!(lines[0].ends_with("50%"));
    }

    #[test]
    fn long_lines_are_split() {
        let mut codec = OutputLineCodec::with_max_length(4);
        let mut buf = BytesMut::from(&b"abcdefgh\n"[..]);
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("abcd"));
        assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("efgh"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
    }
}
