use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::error::HttpError;
use crate::http::headers::{HeaderTable, CRLF};
use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Position of a [`ResponseWriter`] in the response framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    /// Nothing written yet
    StatusLine,
    /// Status line written, header block next
    Headers,
    /// Header block written; raw body or first chunk next
    Body,
    /// At least one chunk written
    ChunkedBody,
    /// Terminal chunk written, trailer block next
    Trailers,
    /// Response fully framed
    Done,
}

/// Writes one HTTP/1.1 response straight to `sink`, enforcing element order.
///
/// Every method checks the state before touching the sink, so an
/// out-of-order call fails with [`HttpError::InvalidWriteOrder`] without
/// writing anything.
///
/// ```text
/// StatusLine -> Headers -> Body -+-> (write_body)*
///                                +-> (write_chunked_body)* -> done(false) -> Done
///                                                          -> done(true) -> Trailers -> Done
/// ```
pub struct ResponseWriter<W> {
    sink: W,
    state: WriterState,
}

impl<W> ResponseWriter<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            state: WriterState::StatusLine,
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    /// Whether anything has been written to the sink yet.
    pub fn has_started(&self) -> bool {
        self.state != WriterState::StatusLine
    }

    pub async fn write_status_line(&mut self, status: StatusCode) -> Result<(), HttpError> {
        self.ensure(&[WriterState::StatusLine], "write status line")?;

        let code = status.as_u16();
        let line = match status.reason_phrase() {
            Some(reason) => format!("{HTTP_VERSION} {code} {reason}\r\n"),
            None => format!("{HTTP_VERSION} {code} \r\n"),
        };
        self.sink.write_all(line.as_bytes()).await?;

        self.state = WriterState::Headers;
        Ok(())
    }

    /// Writes the header block and its terminating blank line.
    ///
    /// Entries go out in the table's insertion order, but peers must not
    /// depend on header order.
    pub async fn write_headers(&mut self, headers: &HeaderTable) -> Result<(), HttpError> {
        self.ensure(&[WriterState::Headers], "write headers")?;

        self.write_header_block(headers).await?;

        self.state = WriterState::Body;
        Ok(())
    }

    /// Writes raw body bytes for a response with a declared `Content-Length`.
    pub async fn write_body(&mut self, body: &[u8]) -> Result<usize, HttpError> {
        self.ensure(&[WriterState::Body], "write body")?;

        self.sink.write_all(body).await?;
        Ok(body.len())
    }

    /// Writes `data` as one chunk: `<HEX LEN>\r\n<data>\r\n`.
    ///
    /// Returns the number of bytes put on the wire. An empty `data` writes
    /// nothing, since a zero-size chunk would end the body.
    pub async fn write_chunked_body(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        self.ensure(&[WriterState::Body, WriterState::ChunkedBody], "write chunked body")?;

        if data.is_empty() {
            self.state = WriterState::ChunkedBody;
            return Ok(0);
        }

        let size_line = format!("{:X}\r\n", data.len());
        let mut frame = Vec::with_capacity(size_line.len() + data.len() + CRLF.len());
        frame.extend_from_slice(size_line.as_bytes());
        frame.extend_from_slice(data);
        frame.extend_from_slice(CRLF);
        self.sink.write_all(&frame).await?;

        self.state = WriterState::ChunkedBody;
        Ok(frame.len())
    }

    /// Writes the zero-length terminal chunk.
    ///
    /// Without trailers the response is finished here; with trailers it is
    /// left open for [`write_trailers`](Self::write_trailers).
    pub async fn write_chunked_body_done(&mut self, has_trailers: bool) -> Result<usize, HttpError> {
        self.ensure(&[WriterState::Body, WriterState::ChunkedBody], "finish chunked body")?;

        let terminator: &[u8] = if has_trailers { b"0\r\n" } else { b"0\r\n\r\n" };
        self.sink.write_all(terminator).await?;

        self.state = if has_trailers {
            WriterState::Trailers
        } else {
            WriterState::Done
        };
        Ok(terminator.len())
    }

    /// Writes the trailer block and the final blank line.
    pub async fn write_trailers(&mut self, trailers: &HeaderTable) -> Result<(), HttpError> {
        self.ensure(&[WriterState::Trailers], "write trailers")?;

        self.write_header_block(trailers).await?;

        self.state = WriterState::Done;
        Ok(())
    }

    /// Writes a buffered response: status line, headers and body.
    pub async fn write_response(&mut self, response: &Response) -> Result<(), HttpError> {
        self.write_status_line(response.status).await?;
        self.write_headers(&response.headers).await?;
        self.write_body(&response.body).await?;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), HttpError> {
        self.sink.flush().await?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.sink
    }

    async fn write_header_block(&mut self, headers: &HeaderTable) -> Result<(), HttpError> {
        let mut block = Vec::new();
        headers.write_lines(&mut block);
        block.extend_from_slice(CRLF);
        self.sink.write_all(&block).await?;
        Ok(())
    }

    fn ensure(&self, allowed: &[WriterState], attempted: &'static str) -> Result<(), HttpError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(HttpError::InvalidWriteOrder {
                state: self.state,
                attempted,
            })
        }
    }
}
