//! Incremental decoding of streamed paragraph diffs
//!
//! The diff service answers with a sequence of JSON objects, concatenated or
//! newline-delimited, that may be split anywhere across reads.

use crate::session::CancellationToken;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, warn};

const READ_CHUNK: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffRequest {
    pub original_text: String,
    pub new_text: String,
}

/// One diff entry as sent by the service
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffChunk {
    pub original_paragraph: String,
    pub new_paragraph: String,
    pub diff: Value,
    pub done: bool,
}

impl DiffChunk {
    /// A bare `{"done": true}` terminator carries no diff entry
    fn is_terminator_only(&self) -> bool {
        self.done
            && self.original_paragraph.is_empty()
            && self.new_paragraph.is_empty()
            && self.diff.is_null()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiffStreamError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed diff chunk: {0}")]
    Malformed(String),
    #[error("stream ended inside a chunk ({0} bytes unparsed)")]
    Truncated(usize),
}

/// Why a stream stopped producing chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    Done,
    Eof,
    Cancelled,
}

/// Pulls [`DiffChunk`]s out of a byte stream
///
/// Once it has ended (done chunk, end of input, cancellation or error) it
/// never yields again.
pub struct DiffStream<R> {
    reader: R,
    buf: Vec<u8>,
    token: CancellationToken,
    end: Option<StreamEnd>,
    failed: bool,
}

impl<R: AsyncRead + Unpin> DiffStream<R> {
    pub fn new(reader: R, token: CancellationToken) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            token,
            end: None,
            failed: false,
        }
    }

    pub fn end(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Next diff entry, or `None` once the stream has ended
    pub async fn next_chunk(&mut self) -> Result<Option<DiffChunk>, DiffStreamError> {
        loop {
            if self.end.is_some() || self.failed {
                return Ok(None);
            }
            if self.token.is_cancelled() {
                debug!("diff stream cancelled");
                self.end = Some(StreamEnd::Cancelled);
                return Ok(None);
            }

            match self.decode_buffered() {
                Ok(Some(chunk)) => {
                    if chunk.done {
                        self.end = Some(StreamEnd::Done);
                        if chunk.is_terminator_only() {
                            return Ok(None);
                        }
                    }
                    return Ok(Some(chunk));
                }
                Ok(None) => {}
                Err(e) => {
                    self.failed = true;
                    return Err(e);
                }
            }

            if !self.fill().await? {
                return Ok(None);
            }
        }
    }

    /// Append chunks to `out` until the stream ends
    ///
    /// Chunks decoded before an error stay in `out`.
    pub async fn collect_into(&mut self, out: &mut Vec<DiffChunk>) -> Result<StreamEnd, DiffStreamError> {
        while let Some(chunk) = self.next_chunk().await? {
            out.push(chunk);
        }
        Ok(self.end.unwrap_or(StreamEnd::Eof))
    }

    /// Read more input; `false` when the stream ended instead
    async fn fill(&mut self) -> Result<bool, DiffStreamError> {
        let mut scratch = vec![0u8; READ_CHUNK];
        let token = self.token.clone();
        let read = tokio::select! {
            biased;
            _ = token.cancelled() => {
                self.end = Some(StreamEnd::Cancelled);
                return Ok(false);
            }
            read = self.reader.read(&mut scratch) => read,
        };

        let n = match read {
            Ok(n) => n,
            Err(e) => {
                self.failed = true;
                return Err(e.into());
            }
        };
        if n == 0 {
            let leftover = self.buf.iter().filter(|b| !b.is_ascii_whitespace()).count();
            if leftover > 0 {
                warn!(bytes = leftover, "diff stream ended mid-chunk");
                self.failed = true;
                return Err(DiffStreamError::Truncated(leftover));
            }
            self.end = Some(StreamEnd::Eof);
            return Ok(false);
        }
        self.buf.extend_from_slice(&scratch[..n]);
        Ok(true)
    }

    /// Decode one complete object from the buffer, if one is there
    fn decode_buffered(&mut self) -> Result<Option<DiffChunk>, DiffStreamError> {
        let mut objects = serde_json::Deserializer::from_slice(&self.buf).into_iter::<DiffChunk>();
        match objects.next() {
            Some(Ok(chunk)) => {
                let consumed = objects.byte_offset();
                self.buf.drain(..consumed);
                Ok(Some(chunk))
            }
            Some(Err(e)) if e.is_eof() => Ok(None),
            Some(Err(e)) => Err(DiffStreamError::Malformed(e.to_string())),
            None => {
                self.buf.clear();
                Ok(None)
            }
        }
    }
}
