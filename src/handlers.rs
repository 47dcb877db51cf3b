//! Route table served by the `httpwire` binary.
//!
//! Each route exercises a different writer path: fixed-length HTML,
//! chunked pass-through with trailers, and a streamed file body.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncWrite};

use crate::config::Config;
use crate::http::connection::Handler;
use crate::http::error::HttpError;
use crate::http::headers::HeaderTable;
use crate::http::request::Request;
use crate::http::response::{Response, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::proxy::Upstream;

const FILE_CHUNK_SIZE: usize = 64 * 1024;

const OK_HTML: &str = "<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
";

const BAD_REQUEST_HTML: &str = "<html>
  <head>
    <title>400 Bad Request</title>
  </head>
  <body>
    <h1>Bad Request</h1>
    <p>Your request honestly kinda sucked.</p>
  </body>
</html>
";

const INTERNAL_ERROR_HTML: &str = "<html>
  <head>
    <title>500 Internal Server Error</title>
  </head>
  <body>
    <h1>Internal Server Error</h1>
    <p>Okay, you know what? This one is on me.</p>
  </body>
</html>
";

pub struct Routes {
    upstream: Upstream,
    video_path: PathBuf,
}

impl Routes {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let upstream = Upstream::new(&cfg.upstream_url, Duration::from_secs(cfg.upstream_timeout_secs))?;
        Ok(Self {
            upstream,
            video_path: cfg.video_path.clone(),
        })
    }

    async fn open_video(&self) -> std::io::Result<(File, u64)> {
        let file = File::open(&self.video_path).await?;
        let len = file.metadata().await?.len();
        Ok((file, len))
    }

    async fn stream_file<W>(&self, writer: &mut ResponseWriter<W>) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let (mut file, len) = match self.open_video().await {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(path = %self.video_path.display(), error = %e, "Cannot open video file");
                writer.write_response(&Response::internal_error()).await?;
                return Ok(());
            }
        };

        let mut headers = HeaderTable::new();
        headers.set_override("Content-Type", "video/mp4");
        headers.set_override("Content-Length", &len.to_string());
        headers.set_override("Connection", "close");

        writer.write_status_line(StatusCode::Ok).await?;
        writer.write_headers(&headers).await?;

        let mut buf = vec![0u8; FILE_CHUNK_SIZE];
        loop {
            let n = file.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            if let Err(e) = writer.write_body(&buf[..n]).await {
                if is_disconnect(&e) {
                    tracing::info!("Client disconnected before full response was sent");
                    return Ok(());
                }
                return Err(e.into());
            }
        }

        Ok(())
    }
}

impl Handler for Routes {
    async fn handle<W>(&self, writer: &mut ResponseWriter<W>, request: &Request) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let target = request.target();

        if let Some(rest) = target.strip_prefix("/httpbin") {
            if rest.is_empty() || rest.starts_with('/') || rest.starts_with('?') {
                let path = if rest.starts_with('/') { rest.to_string() } else { format!("/{rest}") };
                return self.upstream.stream_to(writer, &path).await;
            }
        }

        let response = match target {
            "/yourproblem" => Response::html(StatusCode::BadRequest, BAD_REQUEST_HTML),
            "/myproblem" => Response::html(StatusCode::InternalServerError, INTERNAL_ERROR_HTML),
            "/video" => return self.stream_file(writer).await,
            _ => Response::html(StatusCode::Ok, OK_HTML),
        };

        writer.write_response(&response).await?;
        Ok(())
    }
}

fn is_disconnect(err: &HttpError) -> bool {
    matches!(
        err,
        HttpError::Io(e) if matches!(e.kind(), ErrorKind::BrokenPipe | ErrorKind::ConnectionReset)
    )
}
