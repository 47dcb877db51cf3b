//! HTTP/1.1 framing over raw byte streams.
//!
//! # Architecture
//!
//! - **`headers`**: case-insensitive header table and its line parser
//! - **`request`**: request line and request values
//! - **`parser`**: incremental request parser and the async read driver
//! - **`response`**: status codes, default headers, buffered responses
//! - **`writer`**: response writer enforcing framing order
//! - **`connection`**: per-connection orchestration and the `Handler` trait
//! - **`error`**: framing errors
//!
//! # Request parser
//!
//! ```text
//!        ┌──────────────────┐
//!        │   Initialized    │ ← Wait for a full request line
//!        └──────┬───────────┘
//!               │ request line parsed
//!               ▼
//!        ┌──────────────────┐
//!        │  ParsingHeaders  │ ← One header line per step
//!        └──────┬───────────┘
//!               │ blank line
//!               ├─ no Content-Length → Completed
//!               ▼
//!        ┌──────────────────┐
//!        │   ParsingBody    │ ← Append until Content-Length
//!        └──────┬───────────┘
//!               ▼
//!        ┌──────────────────┐
//!        │    Completed     │
//!        └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use httpwire::http::connection::{Connection, Handler};
//! use tokio::net::TcpListener;
//!
//! let listener = TcpListener::bind("127.0.0.1:42069").await?;
//! loop {
//!     let (socket, _addr) = listener.accept().await?;
//!     let handler = handler.clone();
//!     tokio::spawn(async move {
//!         if let Err(e) = Connection::new(socket, 8).run(&*handler).await {
//!             eprintln!("Connection error: {e}");
//!         }
//!     });
//! }
//! ```

pub mod connection;
pub mod error;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
