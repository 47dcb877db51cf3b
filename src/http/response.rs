use crate::http::headers::HeaderTable;

/// HTTP status codes used by the server.
///
/// Named variants carry a reason phrase; any other code can be sent through
/// [`StatusCode::Other`] and goes out with an empty reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 202 Accepted
    Accepted,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 401 Unauthorized
    Unauthorized,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 502 Bad Gateway
    BadGateway,
    /// 503 Service Unavailable
    ServiceUnavailable,
    /// Any code without a reason phrase
    Other(u16),
}

impl StatusCode {
    /// Maps a numeric code onto the table, falling back to [`StatusCode::Other`].
    ///
    /// # Example
    ///
    /// ```
    /// # use httpwire::http::response::StatusCode;
    /// assert_eq!(StatusCode::from_u16(404), StatusCode::NotFound);
    /// assert_eq!(StatusCode::from_u16(418), StatusCode::Other(418));
    /// ```
    pub fn from_u16(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            202 => StatusCode::Accepted,
            204 => StatusCode::NoContent,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            502 => StatusCode::BadGateway,
            503 => StatusCode::ServiceUnavailable,
            other => StatusCode::Other(other),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::Accepted => 202,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Unauthorized => 401,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::BadGateway => 502,
            StatusCode::ServiceUnavailable => 503,
            StatusCode::Other(code) => *code,
        }
    }

    /// Returns the standard reason phrase, or `None` for [`StatusCode::Other`].
    pub fn reason_phrase(&self) -> Option<&'static str> {
        let reason = match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::BadGateway => "Bad Gateway",
            StatusCode::ServiceUnavailable => "Service Unavailable",
            StatusCode::Other(_) => return None,
        };
        Some(reason)
    }
}

/// Headers every fixed-length response starts from.
///
/// Connections are never reused, so `connection: close` is always sent.
pub fn default_headers(content_length: usize) -> HeaderTable {
    let mut headers = HeaderTable::new();
    headers.set_override("Content-Length", &content_length.to_string());
    headers.set_override("Connection", "close");
    headers.set_override("Content-Type", "text/plain");
    headers
}

/// A complete, buffered HTTP response.
///
/// Streaming responses bypass this type and drive the
/// [`ResponseWriter`](crate::http::writer::ResponseWriter) directly.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderTable,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```
/// # use httpwire::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .header("Content-Type", "application/json")
///     .body(b"{}".to_vec())
///     .build();
/// assert_eq!(response.headers.get("content-length"), Some("2"));
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    headers: HeaderTable,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderTable::new(),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.set_override(key, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds the final Response.
    ///
    /// Starts from [`default_headers`]; explicitly set headers win, except
    /// that `Content-Length` is only filled in when it was not set.
    pub fn build(self) -> Response {
        let mut headers = default_headers(self.body.len());
        for (name, value) in self.headers.iter() {
            headers.set_override(name, value);
        }

        Response {
            status: self.status,
            headers,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a `text/plain` response.
    pub fn text(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(status).body(body).build()
    }

    /// Creates a `text/html` response.
    pub fn html(status: StatusCode, html: &str) -> Self {
        ResponseBuilder::new(status)
            .header("Content-Type", "text/html")
            .body(html)
            .build()
    }

    pub fn bad_request(message: &str) -> Self {
        Self::text(StatusCode::BadRequest, format!("400 Bad Request: {message}\n"))
    }

    pub fn internal_error() -> Self {
        Self::text(StatusCode::InternalServerError, "500 Internal Server Error\n")
    }

    pub fn bad_gateway() -> Self {
        Self::text(StatusCode::BadGateway, "502 Bad Gateway\n")
    }
}
