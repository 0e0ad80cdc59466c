//! Decoding of newline delimited watch events from a chunked body
use std::{io, str::Utf8Error};

use bytes::{Bytes, BytesMut};
use futures::{future, Stream, StreamExt, TryStreamExt};
use kubedyn_core::WatchEvent;
use thiserror::Error;
use tokio_util::{
    codec::{Decoder, FramedRead},
    io::StreamReader,
};
use tower::BoxError;

/// Errors terminating a watch event stream
#[derive(Error, Debug)]
pub enum DecodeError {
    /// Reading the body failed
    #[error("failed to read watch body: {0}")]
    Io(#[from] io::Error),

    /// A line was not valid UTF-8
    #[error("watch line is not valid UTF-8: {0}")]
    Utf8(#[source] Utf8Error),

    /// A line was not a valid watch event
    #[error("invalid watch event {line:?}: {source}")]
    Json {
        /// The offending line, without its separator
        line: String,
        /// Parse failure
        #[source]
        source: serde_json::Error,
    },
}

/// Splits a byte stream into lines and parses each line as one [`WatchEvent`].
///
/// Only complete lines are parsed; a partial line stays buffered until the next chunk.
/// At the end of the input a non-empty remainder is parsed as a final event.
#[derive(Debug, Default)]
pub struct WatchEventCodec {
    // Bytes before this offset are known to contain no separator.
    next_index: usize,
}

impl WatchEventCodec {
    /// New codec with an empty line buffer
    pub fn new() -> Self {
        Self::default()
    }
}

impl Decoder for WatchEventCodec {
    type Error = DecodeError;
    type Item = WatchEvent;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<WatchEvent>, DecodeError> {
        match buf[self.next_index..].iter().position(|b| *b == b'\n') {
            Some(offset) => {
                let line = buf.split_to(self.next_index + offset + 1);
                self.next_index = 0;
                parse_line(&line[..line.len() - 1]).map(Some)
            }
            None => {
                self.next_index = buf.len();
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<WatchEvent>, DecodeError> {
        if let Some(event) = self.decode(buf)? {
            return Ok(Some(event));
        }
        if buf.is_empty() {
            return Ok(None);
        }
        let rest = buf.split();
        self.next_index = 0;
        parse_line(&rest).map(Some)
    }
}

fn parse_line(line: &[u8]) -> Result<WatchEvent, DecodeError> {
    let text = std::str::from_utf8(line).map_err(DecodeError::Utf8)?;
    serde_json::from_str(text).map_err(|source| DecodeError::Json {
        line: text.to_string(),
        source,
    })
}

/// Decode a stream of body chunks into watch events
///
/// Events are yielded as soon as their line completes, regardless of chunk boundaries.
/// The stream ends after the first error.
pub fn decode_events<S, E>(chunks: S) -> impl Stream<Item = Result<WatchEvent, DecodeError>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: Into<BoxError>,
{
    let reader = StreamReader::new(chunks.map_err(io::Error::other));
    FramedRead::new(reader, WatchEventCodec::new()).scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        *failed = item.is_err();
        future::ready(Some(item))
    })
}
