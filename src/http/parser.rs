use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::http::error::HttpError;
use crate::http::headers::{find_crlf, HeaderTable, CRLF};
use crate::http::request::{Method, Request, RequestLine};

/// Initial capacity of the read buffer used by [`read_request`].
///
/// Deliberately tiny: the buffer doubles whenever it fills up.
pub const DEFAULT_READ_BUFFER: usize = 8;

/// Upper bound for the request line plus header block, in bytes.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

const SUPPORTED_VERSION: &str = "1.1";

/// Parser phases, in strict forward order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParseState {
    #[default]
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Completed,
}

/// Incremental HTTP/1.1 request parser.
///
/// Bytes are offered with [`feed`](RequestParser::feed), which returns how
/// many of them were consumed. Unconsumed bytes belong to a structural unit
/// (request line, header line) that has not fully arrived yet; the caller
/// keeps them and offers them again, followed by whatever arrives next.
///
/// ```
/// # use httpwire::http::parser::{ParseState, RequestParser};
/// let mut parser = RequestParser::new();
/// assert_eq!(parser.feed(b"GET / HT").unwrap(), 0);
/// assert_eq!(parser.feed(b"GET / HTTP/1.1\r\nHo").unwrap(), 16);
/// assert_eq!(parser.state(), ParseState::ParsingHeaders);
/// assert_eq!(parser.feed(b"Host: a\r\n\r\n").unwrap(), 11);
/// assert_eq!(parser.state(), ParseState::Completed);
/// ```
#[derive(Debug, Default)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: HeaderTable,
    body: Vec<u8>,
    content_length: Option<usize>,
}

impl RequestParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_complete(&self) -> bool {
        self.state == ParseState::Completed
    }

    /// Consumes as much of `data` as the current state machine allows.
    ///
    /// Runs the step for the current state until a step makes no progress
    /// or the request is complete.
    pub fn feed(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        if self.is_complete() {
            return Err(HttpError::AlreadyCompleted);
        }

        let mut consumed = 0;
        while !self.is_complete() {
            let n = self.step(&data[consumed..])?;
            consumed += n;
            if n == 0 {
                break;
            }
        }

        Ok(consumed)
    }

    fn step(&mut self, data: &[u8]) -> Result<usize, HttpError> {
        match self.state {
            ParseState::Initialized => {
                let Some((line, consumed)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = Some(line);
                self.state = ParseState::ParsingHeaders;
                Ok(consumed)
            }

            ParseState::ParsingHeaders => {
                let (consumed, done) = self.headers.parse(data)?;
                if done {
                    self.content_length = declared_content_length(&self.headers)?;
                    self.state = match self.content_length {
                        Some(_) => ParseState::ParsingBody,
                        None => ParseState::Completed,
                    };
                }
                Ok(consumed)
            }

            ParseState::ParsingBody => {
                let expected = self.content_length.unwrap_or(0);
                self.body.extend_from_slice(data);

                if self.body.len() > expected {
                    return Err(HttpError::BodyTooLong {
                        expected,
                        actual: self.body.len(),
                    });
                }
                if self.body.len() == expected {
                    self.state = ParseState::Completed;
                }
                Ok(data.len())
            }

            ParseState::Completed => Err(HttpError::AlreadyCompleted),
        }
    }

    /// Signals end of stream and returns the request.
    ///
    /// A request whose header block never saw its blank line is accepted as
    /// is, unless a declared `Content-Length` is left unmet.
    pub fn finish(mut self) -> Result<Request, HttpError> {
        match self.state {
            ParseState::Completed => {}
            ParseState::Initialized => return Err(HttpError::IncompleteRequest),
            ParseState::ParsingHeaders | ParseState::ParsingBody => {
                let expected = match self.content_length {
                    Some(len) => Some(len),
                    None => declared_content_length(&self.headers)?,
                };
                if let Some(expected) = expected {
                    if self.body.len() < expected {
                        return Err(HttpError::TruncatedBody {
                            expected,
                            actual: self.body.len(),
                        });
                    }
                }
                self.state = ParseState::Completed;
            }
        }

        self.into_request().ok_or(HttpError::IncompleteRequest)
    }

    /// The parsed request, if the parser reached `Completed`.
    pub fn into_request(self) -> Option<Request> {
        if !self.is_complete() {
            return None;
        }
        Some(Request {
            request_line: self.request_line?,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Reads one request from `reader`.
///
/// Returns `Ok(None)` if the stream ends before a single byte arrives.
/// The read buffer starts at `initial_capacity` bytes and doubles whenever a
/// read would find it full; consumed bytes are dropped from its front.
/// Reading stops with [`HttpError::HeadTooLarge`] once more than
/// [`MAX_HEAD_SIZE`] bytes arrived without the header block ending.
///
/// No read is issued after the request completes, so bytes following a
/// complete request are never looked at. Extra body bytes only fail with
/// [`HttpError::BodyTooLong`] when they arrive in the same read as the end
/// of the declared body; [`parse_http_request`] always sees them.
pub async fn read_request<R>(reader: &mut R, initial_capacity: usize) -> Result<Option<Request>, HttpError>
where
    R: AsyncRead + Unpin,
{
    let initial_capacity = initial_capacity.max(1);
    let mut buffer = BytesMut::with_capacity(initial_capacity);
    let mut parser = RequestParser::new();
    let mut received = 0usize;

    loop {
        if buffer.len() == buffer.capacity() {
            let grow_by = buffer.capacity().max(initial_capacity);
            buffer.reserve(grow_by);
        }

        let n = reader.read_buf(&mut buffer).await?;
        if n == 0 {
            if received == 0 {
                return Ok(None);
            }
            return parser.finish().map(Some);
        }
        received += n;

        let consumed = parser.feed(&buffer)?;
        buffer.advance(consumed);

        match parser.state() {
            ParseState::Completed => {
                tracing::trace!(received, unparsed = buffer.len(), "request complete");
                return Ok(parser.into_request());
            }
            ParseState::Initialized | ParseState::ParsingHeaders if received > MAX_HEAD_SIZE => {
                return Err(HttpError::HeadTooLarge { limit: MAX_HEAD_SIZE });
            }
            _ => {}
        }
    }
}

/// Parses `buf` as the entire byte stream of one request.
pub fn parse_http_request(buf: &[u8]) -> Result<Request, HttpError> {
    let mut parser = RequestParser::new();
    parser.feed(buf)?;
    parser.finish()
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, HttpError> {
    let Some(line_end) = find_crlf(data) else {
        return Ok(None);
    };

    let raw = &data[..line_end];
    let line = std::str::from_utf8(raw)
        .map_err(|_| HttpError::MalformedRequestLine(String::from_utf8_lossy(raw).into_owned()))?;

    let parts: Vec<&str> = line.split(' ').collect();
    let &[method, target, version] = parts.as_slice() else {
        return Err(HttpError::MalformedRequestLine(line.to_string()));
    };

    let version = version
        .strip_prefix("HTTP/")
        .filter(|v| *v == SUPPORTED_VERSION)
        .ok_or_else(|| HttpError::UnsupportedVersion(version.to_string()))?;

    let method = Method::from_token(method).ok_or_else(|| HttpError::UnknownMethod(method.to_string()))?;

    if !target.starts_with('/') {
        return Err(HttpError::InvalidTarget(target.to_string()));
    }

    let request_line = RequestLine {
        method,
        target: target.to_string(),
        version: version.to_string(),
    };
    Ok(Some((request_line, line_end + CRLF.len())))
}

fn declared_content_length(headers: &HeaderTable) -> Result<Option<usize>, HttpError> {
    let Some(raw) = headers.get("content-length") else {
        return Ok(None);
    };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(HttpError::InvalidContentLength(raw.to_string()));
    }

    raw.parse::<usize>()
        .map(Some)
        .map_err(|_| HttpError::InvalidContentLength(raw.to_string()))
}
