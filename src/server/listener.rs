use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{debug, error, info, Instrument};

use crate::config::Config;
use crate::http::connection::{Connection, Handler};

/// Stops a running [`Server`] from another task.
///
/// The closed flag lets the accept loop tell an intentional close apart
/// from an accept failure.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    closed: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn notified(&self) {
        self.notify.notified().await
    }
}

/// TCP server spawning one task per accepted connection.
pub struct Server<H> {
    listener: TcpListener,
    handler: Arc<H>,
    read_buffer_size: usize,
    shutdown: ShutdownHandle,
}

impl<H: Handler> Server<H> {
    pub async fn bind(cfg: &Config, handler: H) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(&cfg.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", cfg.listen_addr))?;

        Ok(Self {
            listener,
            handler: Arc::new(handler),
            read_buffer_size: cfg.read_buffer_size,
            shutdown: ShutdownHandle::default(),
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Accepts connections until the shutdown handle is closed.
    ///
    /// Connections already accepted keep running after this returns.
    pub async fn run(self) -> anyhow::Result<()> {
        let Server {
            listener,
            handler,
            read_buffer_size,
            shutdown,
        } = self;

        info!("Listening on {}", listener.local_addr()?);

        while !shutdown.is_closed() {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        debug!("Accepted connection from {}", peer);

                        let handler = Arc::clone(&handler);
                        let span = tracing::info_span!("conn", %peer);
                        tokio::spawn(
                            async move {
                                let conn = Connection::new(socket, read_buffer_size);
                                if let Err(e) = conn.run(&*handler).await {
                                    error!("Connection error: {:#}", e);
                                }
                            }
                            .instrument(span),
                        );
                    }
                    Err(e) => {
                        if shutdown.is_closed() {
                            break;
                        }
                        error!(error = %e, "Failed to accept connection");
                    }
                },

                _ = shutdown.notified() => {}
            }
        }

        info!("Listener closed");
        Ok(())
    }
}
