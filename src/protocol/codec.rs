//! Newline-framed telemetry codec
//!
//! Implements `tokio_util::codec` traits so the protocol can sit on any
//! `AsyncRead`/`AsyncWrite` transport via `FramedRead`/`FramedWrite`.
//!
//! A malformed record is surfaced as [`Record::Malformed`] instead of a
//! decoder error: `FramedRead` stops after the first `Err`, and a bad line
//! must never end the stream. Only transport errors are returned as `Err`.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::error::ProtocolError;
use crate::protocol::record::{format_record, parse_record, MotionSample};

/// Default upper bound for a single line, newline excluded
pub const DEFAULT_MAX_LINE_LENGTH: usize = 256;

/// One decoded line
#[derive(Debug)]
pub enum Record {
    /// Well-formed sample
    Sample(MotionSample),
    /// Line that was dropped, with the reason
    Malformed(ProtocolError),
}

/// Codec for `"<float> <float>\n"` records
#[derive(Debug, Clone)]
pub struct TelemetryCodec {
    /// Maximum accepted line length in bytes
    max_line_length: usize,

    /// Bytes already scanned for a newline
    next_index: usize,

    /// Skipping the tail of an oversized line
    discarding: bool,
}

impl TelemetryCodec {
    /// Create a codec with [`DEFAULT_MAX_LINE_LENGTH`]
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom line limit
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Maximum accepted line length in bytes
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    fn parse_line(line: &[u8]) -> Record {
        match std::str::from_utf8(line) {
            Ok(text) => match parse_record(text) {
                Ok(sample) => Record::Sample(sample),
                Err(e) => Record::Malformed(e),
            },
            Err(_) => Record::Malformed(ProtocolError::InvalidUtf8),
        }
    }
}

impl Default for TelemetryCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for TelemetryCodec {
    type Item = Record;
    type Error = ProtocolError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Record>, ProtocolError> {
        loop {
            // Never scan past one byte beyond the limit
            let read_to = buf.len().min(self.max_line_length.saturating_add(1));
            let newline = buf[self.next_index..read_to]
                .iter()
                .position(|b| *b == b'\n');

            match (self.discarding, newline) {
                (true, Some(offset)) => {
                    // Tail of the oversized line; it was already reported
                    buf.advance(self.next_index + offset + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    buf.advance(read_to);
                    self.next_index = 0;
                    if buf.is_empty() {
                        return Ok(None);
                    }
                }
                (false, Some(offset)) => {
                    let newline_index = self.next_index + offset;
                    self.next_index = 0;
                    let line = buf.split_to(newline_index + 1);
                    return Ok(Some(Self::parse_line(&line[..newline_index])));
                }
                (false, None) if buf.len() > self.max_line_length => {
                    self.discarding = true;
                    return Ok(Some(Record::Malformed(ProtocolError::LineTooLong {
                        limit: self.max_line_length,
                    })));
                }
                (false, None) => {
                    self.next_index = read_to;
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Record>, ProtocolError> {
        if let Some(record) = self.decode(buf)? {
            return Ok(Some(record));
        }

        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }

        // Final line without a trailing newline
        let line = buf.split_to(buf.len());
        Ok(Some(Self::parse_line(&line)))
    }
}

impl Encoder<MotionSample> for TelemetryCodec {
    type Error = ProtocolError;

    fn encode(&mut self, sample: MotionSample, dst: &mut BytesMut) -> Result<(), ProtocolError> {
        if !sample.is_finite() {
            return Err(ProtocolError::NonFinite {
                line: format!("{:?} {:?}", sample.dx, sample.dy),
            });
        }

        let record = format_record(&sample);
        dst.reserve(record.len());
        dst.put_slice(record.as_bytes());
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn line_strategy() -> impl Strategy<Value = (String, Option<MotionSample>)> {
        prop_oneof![
            (-1.0e3f64..1.0e3, -1.0e3f64..1.0e3).prop_map(|(dx, dy)| {
                let sample = MotionSample::new(dx, dy);
                (format_record(&sample), Some(sample))
            }),
            "[a-z ]{0,12}".prop_map(|junk| (format!("{}\n", junk), None)),
            Just(("1 2 3\n".to_string(), None)),
            Just(("\n".to_string(), None)),
        ]
    }

    proptest! {
        #[test]
        fn prop_valid_lines_survive_any_interleaving(
            lines in proptest::collection::vec(line_strategy(), 0..40),
            chunk in 1usize..17,
        ) {
            let input: String = lines.iter().map(|(l, _)| l.as_str()).collect();
            let expected: Vec<MotionSample> = lines.iter().filter_map(|(_, s)| *s).collect();

            // Feed in fixed-size chunks to exercise partial reads
            let mut codec = TelemetryCodec::new();
            let mut buf = BytesMut::new();
            let mut decoded = Vec::new();
            for piece in input.as_bytes().chunks(chunk) {
                buf.extend_from_slice(piece);
                while let Some(record) = codec.decode(&mut buf).unwrap() {
                    if let Record::Sample(s) = record {
                        decoded.push(s);
                    }
                }
            }
            while let Some(record) = codec.decode_eof(&mut buf).unwrap() {
                if let Record::Sample(s) = record {
                    decoded.push(s);
                }
            }

            prop_assert_eq!(decoded, expected);
        }
    }
}
