//! NDJSON framing for search tool streams.
//!
//! Implements [`tokio_util::codec::Decoder`] and [`Encoder`] so the tool's
//! stdout can be read with [`tokio_util::codec::FramedRead`] and its stdin
//! written with [`tokio_util::codec::FramedWrite`]. Each `\n`-terminated line
//! is one protocol message; a trailing `\r` is stripped.
//!
//! Bytes that are not valid UTF-8 are replaced with U+FFFD instead of failing
//! the stream, so a garbled diagnostic line reaches the message layer as noise
//! and later lines keep flowing. Only I/O errors end the stream.
//!
//! The read buffer keeps any unterminated trailing fragment between
//! deliveries, so several messages arriving in one read and one message split
//! across many reads both decode to the same sequence of lines. No line
//! length limit is enforced: a very long line only delays decoding until its
//! terminator arrives.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tokio_util::codec::FramedRead;
//! use issue_search::tool::codec::ToolCodec;
//!
//! let lines = FramedRead::new(child_stdout, ToolCodec::new());
//! ```

use std::borrow::Cow;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::debug;

use crate::{AppError, Result};

/// Newline-delimited line codec for the search tool's stdio streams.
#[derive(Debug, Default)]
pub struct ToolCodec {
    /// Bytes of `src` already scanned for a newline.
    next_index: usize,
}

impl ToolCodec {
    /// Create a new `ToolCodec` with no maximum line length.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for ToolCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete line from `src`.
    ///
    /// Returns `Ok(None)` while `src` holds only an unterminated fragment.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') else {
            self.next_index = src.len();
            return Ok(None);
        };
        let newline = self.next_index + offset;
        self.next_index = 0;
        let line = src.split_to(newline + 1);
        Ok(Some(line_to_string(&line[..newline])))
    }

    /// Decode the final, possibly unterminated, line once the stream closes.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        self.next_index = 0;
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split();
        Ok(Some(line_to_string(&rest)))
    }
}

impl Encoder<String> for ToolCodec {
    type Error = AppError;

    /// Encode `item` as a `\n`-terminated line into `dst`.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        dst.reserve(item.len() + 1);
        dst.put(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

// ── Private helper ────────────────────────────────────────────────────────────

fn line_to_string(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    match String::from_utf8_lossy(bytes) {
        Cow::Borrowed(line) => line.to_owned(),
        Cow::Owned(line) => {
            debug!(len = bytes.len(), "tool output: invalid utf-8 replaced");
            line
        }
    }
}
