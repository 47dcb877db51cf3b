use std::future::Future;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

use crate::http::error::HttpError;
use crate::http::parser::read_request;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Application callback producing the response for one parsed request.
///
/// Called exactly once per successfully parsed request. The implementation
/// owns the framing of its response through `writer`; if it fails before
/// writing a status line the connection answers with a 500 on its behalf.
pub trait Handler: Send + Sync + 'static {
    fn handle<W>(
        &self,
        writer: &mut ResponseWriter<W>,
        request: &Request,
    ) -> impl Future<Output = anyhow::Result<()>> + Send
    where
        W: AsyncWrite + Unpin + Send;
}

enum ConnectionState {
    Reading,
    Dispatching(Request),
    Rejecting(HttpError),
    Closed,
}

/// One accepted connection, served for exactly one request.
pub struct Connection<S> {
    stream: S,
    read_buffer_size: usize,
    state: ConnectionState,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, read_buffer_size: usize) -> Self {
        Self {
            stream,
            read_buffer_size,
            state: ConnectionState::Reading,
        }
    }

    /// Reads a request, dispatches it and writes the response.
    ///
    /// The stream is shut down on every exit path.
    pub async fn run<H: Handler>(mut self, handler: &H) -> anyhow::Result<()> {
        let served = self.serve(handler).await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(error = %e, "Connection shutdown failed");
        }

        served
    }

    async fn serve<H: Handler>(&mut self, handler: &H) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match read_request(&mut self.stream, self.read_buffer_size).await {
                        Ok(Some(request)) => ConnectionState::Dispatching(request),
                        Ok(None) => {
                            debug!("Peer closed before sending a request");
                            ConnectionState::Closed
                        }
                        Err(e) if e.is_client_error() => ConnectionState::Rejecting(e),
                        Err(e) => return Err(e).context("failed to read request"),
                    };
                }

                ConnectionState::Dispatching(request) => {
                    info!(
                        method = %request.method(),
                        target = %request.target(),
                        body_len = request.body.len(),
                        "Request received"
                    );

                    let mut writer = ResponseWriter::new(&mut self.stream);
                    if let Err(e) = handler.handle(&mut writer, &request).await {
                        if !writer.has_started() {
                            writer
                                .write_response(&Response::internal_error())
                                .await
                                .context("failed to write 500 response")?;
                            writer.flush().await?;
                        }
                        return Err(e.context("handler failed"));
                    }
                    writer.flush().await?;
                }

                ConnectionState::Rejecting(error) => {
                    warn!(error = %error, "Rejecting malformed request");

                    let mut writer = ResponseWriter::new(&mut self.stream);
                    writer
                        .write_response(&Response::bad_request(&error.to_string()))
                        .await
                        .context("failed to write 400 response")?;
                    writer.flush().await?;
                }

                ConnectionState::Closed => return Ok(()),
            }
        }
    }
}
