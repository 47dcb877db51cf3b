use std::fmt;

use crate::http::headers::HeaderTable;

/// HTTP request methods accepted by the parser.
///
/// Anything outside this set is rejected with
/// [`HttpError::UnknownMethod`](crate::http::error::HttpError::UnknownMethod).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Create or submit data
    POST,
    /// PUT - Replace a resource
    PUT,
    /// PATCH - Partial modification of a resource
    PATCH,
    /// DELETE - Delete a resource
    DELETE,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// OPTIONS - Describe communication options
    OPTIONS,
    /// TRACE - Loop-back of the request message
    TRACE,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Matching is case-sensitive, as method tokens are.
    ///
    /// # Example
    ///
    /// ```
    /// # use httpwire::http::request::Method;
    /// assert_eq!(Method::from_token("TRACE"), Some(Method::TRACE));
    /// assert_eq!(Method::from_token("get"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "PATCH" => Some(Method::PATCH),
            "DELETE" => Some(Method::DELETE),
            "HEAD" => Some(Method::HEAD),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::PATCH => "PATCH",
            Method::DELETE => "DELETE",
            Method::HEAD => "HEAD",
            Method::OPTIONS => "OPTIONS",
            Method::TRACE => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first line of a request, always fully validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: Method,
    /// Origin-form target, always starting with `/` (e.g. "/search?q=rust")
    pub target: String,
    /// Protocol version without the `HTTP/` prefix; always "1.1"
    pub version: String,
}

/// A fully parsed HTTP request.
///
/// Only a [`RequestParser`](crate::http::parser::RequestParser) in the
/// `Completed` state hands these out, so the body always matches the
/// declared `Content-Length`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub request_line: RequestLine,
    /// Request headers, keys lower-cased
    pub headers: HeaderTable,
    /// Request body; empty when no `Content-Length` was sent
    pub body: Vec<u8>,
}

impl Request {
    pub fn method(&self) -> Method {
        self.request_line.method
    }

    pub fn target(&self) -> &str {
        &self.request_line.target
    }

    /// Retrieves a header value by name (case-insensitive).
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key)
    }

    /// The declared `Content-Length`, if present and numeric.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Request line:")?;
        writeln!(f, "- Method: {}", self.request_line.method)?;
        writeln!(f, "- Target: {}", self.request_line.target)?;
        writeln!(f, "- Version: {}", self.request_line.version)?;
        writeln!(f, "Headers:")?;
        for (name, value) in self.headers.iter() {
            writeln!(f, "- {name}: {value}")?;
        }
        if !self.body.is_empty() {
            writeln!(f, "Body:")?;
            writeln!(f, "{}", String::from_utf8_lossy(&self.body))?;
        }
        Ok(())
    }
}
