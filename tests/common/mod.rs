#![allow(dead_code)]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};

/// Reader handing out at most `per_read` bytes per read call, like a slow socket.
pub struct ChunkReader {
    data: Vec<u8>,
    per_read: usize,
    pos: usize,
}

impl ChunkReader {
    pub fn new(data: impl Into<Vec<u8>>, per_read: usize) -> Self {
        Self {
            data: data.into(),
            per_read,
            pos: 0,
        }
    }
}

impl AsyncRead for ChunkReader {
    fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let end = (this.pos + this.per_read).min(this.data.len());
        let n = (end - this.pos).min(buf.remaining());
        buf.put_slice(&this.data[this.pos..this.pos + n]);
        this.pos += n;
        Poll::Ready(Ok(()))
    }
}

/// Decodes a chunked body, returning the payload and the raw trailer block.
pub fn dechunk(mut wire: &[u8]) -> (Vec<u8>, Vec<u8>) {
    let mut body = Vec::new();
    loop {
        let line_end = wire.windows(2).position(|w| w == b"\r\n").expect("chunk size line");
        let size_hex = std::str::from_utf8(&wire[..line_end]).unwrap();
        let size = usize::from_str_radix(size_hex, 16).expect("hex chunk size");
        wire = &wire[line_end + 2..];
        if size == 0 {
            return (body, wire.to_vec());
        }
        body.extend_from_slice(&wire[..size]);
        assert_eq!(&wire[size..size + 2], b"\r\n");
        wire = &wire[size + 2..];
    }
}

/// Splits a serialized response into its head (status line + headers) and body.
pub fn split_head(wire: &[u8]) -> (String, Vec<u8>) {
    let head_end = wire
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("header block terminator");
    let head = String::from_utf8(wire[..head_end + 4].to_vec()).unwrap();
    (head, wire[head_end + 4..].to_vec())
}
