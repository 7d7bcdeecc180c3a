//! Newline-delimited framing for the stdio transport.
//!
//! Incoming bytes accumulate in the read buffer; each call to `decode`
//! extracts at most one complete line from the front and leaves any partial
//! remainder in place for the next read.

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

/// Lines longer than this are discarded and reported as [`Frame::Oversized`].
pub const DEFAULT_MAX_LINE_LENGTH: usize = 8 * 1024 * 1024;

/// One unit of input handed to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, without its terminator. Not yet checked for UTF-8.
    Line(Bytes),
    /// A line that exceeded the length limit. Its content was dropped.
    Oversized,
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Where to resume the newline scan; bytes before it are known not to be `\n`.
    next_index: usize,
    max_length: usize,
    discarding: bool,
}

impl LineCodec {
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            next_index: 0,
            max_length,
            discarding: false,
        }
    }
}

impl LineCodec {
    fn warn_oversized(&self) {
        warn!(
            max_length = self.max_length,
            "Input line exceeds maximum length, discarding"
        );
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LineCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        loop {
            let newline = buf[self.next_index..]
                .iter()
                .position(|b| *b == b'\n')
                .map(|offset| self.next_index + offset);

            match (self.discarding, newline) {
                (true, Some(end)) => {
                    let _ = buf.split_to(end + 1);
                    self.next_index = 0;
                    self.discarding = false;
                    return Ok(Some(Frame::Oversized));
                }
                (true, None) => {
                    buf.clear();
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(end)) => {
                    let mut line = buf.split_to(end + 1);
                    self.next_index = 0;
                    if end > self.max_length {
                        self.warn_oversized();
                        return Ok(Some(Frame::Oversized));
                    }
                    line.truncate(end);
                    if line.last() == Some(&b'\r') {
                        line.truncate(end - 1);
                    }
                    return Ok(Some(Frame::Line(line.freeze())));
                }
                (false, None) if buf.len() > self.max_length => {
                    self.warn_oversized();
                    self.discarding = true;
                    continue;
                }
                (false, None) => {
                    self.next_index = buf.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        if let Some(frame) = self.decode(buf)? {
            return Ok(Some(frame));
        }
        // Only newline-terminated input counts as a message.
        if !buf.is_empty() {
            warn!(bytes = buf.len(), "Dropping unterminated input at end of stream");
            buf.clear();
        }
        self.next_index = 0;
        self.discarding = false;
        Ok(None)
    }
}

impl<T: Serialize> Encoder<&T> for LineCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &T, dst: &mut BytesMut) -> Result<(), FrameError> {
        // Compact JSON escapes every newline inside strings, so one value is one line.
        let json = serde_json::to_vec(item)?;
        dst.reserve(json.len() + 1);
        dst.put_slice(&json);
        dst.put_u8(b'\n');
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn line(s: &str) -> Option<Frame> {
        Some(Frame::Line(Bytes::copy_from_slice(s.as_bytes())))
    }

    #[test]
    fn test_partial_line_is_buffered() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();

        buf.extend_from_slice(b"{\"id\":1,");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\"method\":\"ping\"}");
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"\n");
        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            line("{\"id\":1,\"method\":\"ping\"}")
        );
        assert!(buf.is_empty());
    }

    #[test]
    fn test_multiple_lines_in_one_read() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"first\nsecond\r\nthi"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), line("first"));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("second"));
        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        assert_eq!(&buf[..], b"thi");

        buf.extend_from_slice(b"rd\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), line("third"));
    }

    #[test]
    fn test_byte_at_a_time_fragmentation() {
        let input = b"{\"a\":1}\n\n{\"b\":2}\n";
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();

        for byte in input {
            buf.put_u8(*byte);
            while let Some(frame) = codec.decode(&mut buf).unwrap() {
                frames.push(frame);
            }
        }

        assert_eq!(
            frames,
            vec![
                Frame::Line(Bytes::from_static(b"{\"a\":1}")),
                Frame::Line(Bytes::new()),
                Frame::Line(Bytes::from_static(b"{\"b\":2}")),
            ]
        );
    }

    #[test]
    fn test_split_inside_multibyte_character() {
        let text = "héllo\n".as_bytes();
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&text[..2]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(&text[2..]);
        assert_eq!(codec.decode(&mut buf).unwrap(), line("héllo"));
    }

    #[test]
    fn test_oversized_line_is_reported_and_skipped() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef"[..]);

        assert_eq!(codec.decode(&mut buf).unwrap(), None);
        buf.extend_from_slice(b"ghij\nok\n");
        assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Oversized));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("ok"));
    }

    #[test]
    fn test_invalid_utf8_is_passed_through_unchanged() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"ab\xff\xfecd\r\n"[..]);

        assert_eq!(
            codec.decode(&mut buf).unwrap(),
            Some(Frame::Line(Bytes::from_static(b"ab\xff\xfecd")))
        );
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn decode_with_logs(codec: &mut LineCodec, buf: &mut BytesMut) -> (Option<Frame>, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let frame = tracing::subscriber::with_default(subscriber, || codec.decode(buf).unwrap());
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (frame, output)
    }

    #[test]
    fn test_oversized_line_in_one_read_is_logged() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef\nok\n"[..]);

        let (frame, logs) = decode_with_logs(&mut codec, &mut buf);

        assert_eq!(frame, Some(Frame::Oversized));
        assert!(logs.contains("exceeds maximum length"));
        assert_eq!(codec.decode(&mut buf).unwrap(), line("ok"));
    }

    #[test]
    fn test_oversized_partial_line_is_logged() {
        let mut codec = LineCodec::with_max_length(8);
        let mut buf = BytesMut::from(&b"0123456789abcdef"[..]);

        let (frame, logs) = decode_with_logs(&mut codec, &mut buf);

        assert_eq!(frame, None);
        assert!(logs.contains("exceeds maximum length"));
    }

    #[test]
    fn test_eof_drops_unterminated_tail() {
        let mut codec = LineCodec::new();
        let mut buf = BytesMut::from(&b"done\npartial"[..]);

        assert_eq!(codec.decode_eof(&mut buf).unwrap(), line("done"));
        assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_encode_appends_newline() {
        let mut codec = LineCodec::new();
        let mut dst = BytesMut::new();

        codec
            .encode(&serde_json::json!({"text": "two\nlines"}), &mut dst)
            .unwrap();

        assert_eq!(&dst[..], b"{\"text\":\"two\\nlines\"}\n");
    }
}
