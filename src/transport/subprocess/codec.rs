//! Newline framing for child process output
//!
//! Unlike `tokio_util::codec::LinesCodec` this decoder never fails on content:
//! invalid UTF-8 is replaced lossily and over-long lines are dropped up to the
//! next newline, so one bad line cannot end the stream.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decoder yielding one `String` per newline-terminated line
#[derive(Debug)]
pub struct JsonLineCodec {
    max_length: usize,
    next_index: usize,
    discarding: bool,
}

impl JsonLineCodec {
    /// Create a codec dropping lines longer than `max_length` bytes
    #[must_use]
    pub const fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Maximum accepted line length
    #[must_use]
    pub const fn max_length(&self) -> usize {
        self.max_length
    }
}

fn to_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for JsonLineCodec {
    type Item = String;
    type Error = std::io::Error;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            let newline = buf[self.next_index..].iter().position(|b| *b == b'\n');
            let Some(offset) = newline else {
                if buf.len() > self.max_length {
                    if !self.discarding {
                        log::warn!(
                            "Dropping protocol line longer than {} bytes",
                            self.max_length
                        );
                    }
                    self.discarding = true;
                    buf.clear();
                    self.next_index = 0;
                } else {
                    self.next_index = buf.len();
                }
                return Ok(None);
            };

            let line = buf.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if self.discarding {
                self.discarding = false;
                continue;
            }
            if line.len() - 1 > self.max_length {
                log::warn!(
                    "Dropping protocol line longer than {} bytes",
                    self.max_length
                );
                continue;
            }
            return Ok(Some(to_line(&line)));
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if self.discarding || buf.is_empty() {
            self.discarding = false;
            buf.clear();
            return Ok(None);
        }
        let rest = buf.split_to(buf.len());
        Ok(Some(to_line(&rest)))
    }
}
