//! httpwire - HTTP/1.1 framing over raw byte streams
//!
//! Incremental request parsing, order-enforcing response writing
//! (including chunked bodies with trailers) and a small TCP server.

pub mod config;
pub mod handlers;
pub mod http;
pub mod proxy;
pub mod server;
