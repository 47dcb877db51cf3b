//! Upstream pass-through
//!
//! Fetches a resource from a plain-HTTP upstream and relays its body to the
//! client as chunked transfer-encoding, followed by `X-Content-SHA256` and
//! `X-Content-Length` trailers computed over the relayed bytes. The upstream request is sent as HTTP/1.0 with
//! `Connection: close`, so the upstream answers with a body delimited by
//! connection close and never chunks it itself.

use anyhow::{Context, Result};
use bytes::{Buf, BytesMut};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;

use crate::http::headers::{find_crlf, HeaderTable, CRLF};
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;

/// Default buffer size for streaming
const BUFFER_SIZE: usize = 8192;

/// Upper bound for the upstream status line plus headers
const MAX_HEAD_SIZE: usize = 64 * 1024;

/// A plain-HTTP server whose responses are relayed as chunked bodies.
#[derive(Debug, Clone)]
pub struct Upstream {
    base_url: Url,
    timeout: Duration,
}

impl Upstream {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).context("Invalid upstream URL")?;
        if base_url.scheme() != "http" {
            anyhow::bail!("Unsupported upstream scheme {:?}, only http is relayed", base_url.scheme());
        }
        if base_url.host_str().is_none() {
            anyhow::bail!("Upstream URL missing host");
        }

        Ok(Self { base_url, timeout })
    }

    /// Resolves a request path (e.g. "/stream/10?x=1") against the base URL.
    pub fn target_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Invalid upstream path {path:?}"))
    }

    /// Builds the raw HTTP/1.0 GET sent upstream.
    pub fn build_request(&self, url: &Url) -> Vec<u8> {
        let mut target = url.path().to_string();
        if let Some(query) = url.query() {
            target.push('?');
            target.push_str(query);
        }

        let host = url.host_str().unwrap_or_default();
        let host_value = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };

        let mut headers = HeaderTable::new();
        headers.set_override("Host", &host_value);
        headers.set_override("User-Agent", concat!("httpwire/", env!("CARGO_PKG_VERSION")));
        headers.set_override("Accept", "*/*");
        headers.set_override("Connection", "close");

        let mut buffer = format!("GET {target} HTTP/1.0\r\n").into_bytes();
        headers.write_lines(&mut buffer);
        buffer.extend_from_slice(CRLF);
        buffer
    }

    /// Relays `path` from the upstream to `writer`.
    ///
    /// If the upstream cannot be reached or its response head is unusable, a
    /// `502 Bad Gateway` is written instead. Failures after the response
    /// head was relayed are returned as errors; the client then sees a
    /// truncated chunked body.
    pub async fn stream_to<W>(&self, writer: &mut ResponseWriter<W>, path: &str) -> Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let url = self.target_url(path)?;

        let (mut stream, status, upstream_headers, leftover) = match self.open(&url).await {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(upstream = %url, error = %e, "Upstream request failed");
                writer.write_response(&Response::bad_gateway()).await?;
                return Ok(());
            }
        };

        tracing::debug!(upstream = %url, status = status.as_u16(), "Relaying upstream response");

        let mut headers = HeaderTable::new();
        headers.set_override("Connection", "close");
        headers.set_override(
            "Content-Type",
            upstream_headers.get("content-type").unwrap_or("text/plain"),
        );
        headers.set_override("Transfer-Encoding", "chunked");
        headers.set_override("Trailer", "X-Content-SHA256, X-Content-Length");

        writer.write_status_line(status).await?;
        writer.write_headers(&headers).await?;

        let mut hasher = Sha256::new();
        let mut relayed = 0usize;
        if !leftover.is_empty() {
            writer.write_chunked_body(&leftover).await?;
            hasher.update(&leftover);
            relayed += leftover.len();
        }

        let mut chunk = vec![0u8; BUFFER_SIZE];
        loop {
            let n = timeout(self.timeout, stream.read(&mut chunk))
                .await
                .context("Upstream read timeout")?
                .context("Upstream read failed")?;
            if n == 0 {
                break;
            }
            writer.write_chunked_body(&chunk[..n]).await?;
            hasher.update(&chunk[..n]);
            relayed += n;
        }

        writer.write_chunked_body_done(true).await?;

        let mut trailers = HeaderTable::new();
        trailers.set("X-Content-SHA256", &format!("{:x}", hasher.finalize()));
        trailers.set("X-Content-Length", &relayed.to_string());
        writer.write_trailers(&trailers).await?;

        tracing::debug!(upstream = %url, relayed, "Upstream body relayed");
        Ok(())
    }

    /// Connects, sends the request and reads the response head.
    async fn open(&self, url: &Url) -> Result<(TcpStream, StatusCode, HeaderTable, BytesMut)> {
        let host = url.host_str().context("Upstream URL missing host")?;
        let port = url.port_or_known_default().unwrap_or(80);
        let addr = format!("{host}:{port}");

        let mut stream = timeout(self.timeout, TcpStream::connect(&addr))
            .await
            .context("Connection timeout")?
            .with_context(|| format!("Failed to connect to {addr}"))?;

        stream.write_all(&self.build_request(url)).await?;
        stream.flush().await?;

        let (status, headers, leftover) = timeout(self.timeout, read_response_head(&mut stream))
            .await
            .context("Response head timeout")??;

        Ok((stream, status, headers, leftover))
    }
}

/// Reads a status line and header block.
///
/// Returns the status, the headers, and any body bytes that arrived with
/// the head.
pub async fn read_response_head<R>(reader: &mut R) -> Result<(StatusCode, HeaderTable, BytesMut)>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = BytesMut::with_capacity(BUFFER_SIZE);

    let status = loop {
        if let Some(line_end) = find_crlf(&buffer) {
            let status = parse_status_line(&buffer[..line_end])?;
            buffer.advance(line_end + CRLF.len());
            break status;
        }
        fill(reader, &mut buffer).await?;
    };

    let mut headers = HeaderTable::new();
    loop {
        let (consumed, done) = headers.parse(&buffer)?;
        buffer.advance(consumed);
        if done {
            return Ok((status, headers, buffer));
        }
        if consumed == 0 {
            fill(reader, &mut buffer).await?;
        }
    }
}

async fn fill<R>(reader: &mut R, buffer: &mut BytesMut) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    if buffer.len() > MAX_HEAD_SIZE {
        anyhow::bail!("Response headers too large");
    }
    let n = reader.read_buf(buffer).await?;
    if n == 0 {
        anyhow::bail!("Connection closed before complete response received");
    }
    Ok(())
}

fn parse_status_line(line: &[u8]) -> Result<StatusCode> {
    let line = std::str::from_utf8(line).context("Invalid UTF-8 in status line")?;

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().unwrap_or_default();
    if !version.starts_with("HTTP/") {
        anyhow::bail!("Invalid status line: {}", line);
    }

    let code: u16 = parts
        .next()
        .context("Status line missing code")?
        .parse()
        .context("Invalid status code")?;

    Ok(StatusCode::from_u16(code))
}
