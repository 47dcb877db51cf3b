mod common;

use std::path::PathBuf;

use common::{dechunk, split_head};
use httpwire::config::Config;
use httpwire::handlers::Routes;
use httpwire::server::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn test_config(upstream_url: &str) -> Config {
    Config {
        listen_addr: "127.0.0.1:0".to_string(),
        upstream_url: upstream_url.to_string(),
        upstream_timeout_secs: 5,
        video_path: PathBuf::from("/nonexistent/httpwire/vim.mp4"),
        ..Config::default()
    }
}

async fn send(addr: std::net::SocketAddr, request: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    response
}

/// Minimal upstream answering every request with a close-delimited JSON body.
async fn fake_upstream() -> (String, tokio::task::JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let task = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 256];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "upstream request ended early");
            request.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"hello\":")
            .await
            .unwrap();
        socket.write_all(b"\"world\"}").await.unwrap();
        socket.shutdown().await.unwrap();
        request
    });

    (format!("http://{addr}"), task)
}

async fn start(cfg: &Config) -> (std::net::SocketAddr, httpwire::server::ShutdownHandle, tokio::task::JoinHandle<anyhow::Result<()>>) {
    let server = Server::bind(cfg, Routes::new(cfg).unwrap()).await.unwrap();
    let addr = server.local_addr().unwrap();
    let shutdown = server.shutdown_handle();
    let running = tokio::spawn(server.run());
    (addr, shutdown, running)
}

#[tokio::test]
async fn test_routes_fixed_length_pages() {
    let cfg = test_config("http://127.0.0.1:9");
    let (addr, shutdown, running) = start(&cfg).await;

    let cases = [
        ("/", "HTTP/1.1 200 OK\r\n", "Success!"),
        ("/yourproblem", "HTTP/1.1 400 Bad Request\r\n", "Bad Request"),
        ("/myproblem", "HTTP/1.1 500 Internal Server Error\r\n", "Internal Server Error"),
    ];

    for (target, status_line, marker) in cases {
        let request = format!("GET {target} HTTP/1.1\r\nHost: localhost:42069\r\n\r\n");
        let response = send(addr, request.as_bytes()).await;

        let (head, body) = split_head(&response);
        assert!(head.starts_with(status_line), "{target}: {head}");
        assert!(head.contains("content-type: text/html\r\n"));
        assert!(head.contains(&format!("content-length: {}\r\n", body.len())));
        assert!(String::from_utf8(body).unwrap().contains(marker));
    }

    shutdown.close();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_missing_video_gets_500() {
    let cfg = test_config("http://127.0.0.1:9");
    let (addr, shutdown, running) = start(&cfg).await;

    let response = send(addr, b"GET /video HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 500 Internal Server Error\r\n"));

    shutdown.close();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_video_is_streamed_with_content_length() {
    let path = std::env::temp_dir().join(format!("httpwire-video-{}.bin", std::process::id()));
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &content).unwrap();

    let mut cfg = test_config("http://127.0.0.1:9");
    cfg.video_path = path.clone();
    let (addr, shutdown, running) = start(&cfg).await;

    let response = send(addr, b"GET /video HTTP/1.1\r\n\r\n").await;
    let (head, body) = split_head(&response);
    assert!(head.contains("content-type: video/mp4\r\n"));
    assert!(head.contains("content-length: 200000\r\n"));
    assert_eq!(body, content);

    shutdown.close();
    running.await.unwrap().unwrap();
    std::fs::remove_file(path).unwrap();
}

#[tokio::test]
async fn test_httpbin_route_relays_chunked_with_trailers() {
    let (upstream_url, upstream) = fake_upstream().await;
    let cfg = test_config(&upstream_url);
    let (addr, shutdown, running) = start(&cfg).await;

    let response = send(addr, b"GET /httpbin/json?pretty=1 HTTP/1.1\r\nHost: localhost:42069\r\n\r\n").await;

    let upstream_request = String::from_utf8(upstream.await.unwrap()).unwrap();
    assert!(upstream_request.starts_with("GET /json?pretty=1 HTTP/1.0\r\n"));
    assert!(upstream_request.contains("connection: close\r\n"));

    let (head, body) = split_head(&response);
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("transfer-encoding: chunked\r\n"));
    assert!(head.contains("trailer: X-Content-SHA256, X-Content-Length\r\n"));
    assert!(head.contains("content-type: application/json\r\n"));

    let (payload, trailers) = dechunk(&body);
    assert_eq!(payload, b"{\"hello\":\"world\"}");
    assert_eq!(
        trailers,
        b"x-content-sha256: 93a23971a914e5eacbf0a8d25154cda309c3c1c72fbb9914d47c60f3cb681588\r\n\
          x-content-length: 17\r\n\r\n"
    );

    shutdown.close();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_httpbin_route_unreachable_upstream_gets_502() {
    // Grab a free port, then release it so nothing is listening there.
    let free = TcpListener::bind("127.0.0.1:0").await.unwrap().local_addr().unwrap();
    let cfg = test_config(&format!("http://{free}"));
    let (addr, shutdown, running) = start(&cfg).await;

    let response = send(addr, b"GET /httpbin/get HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 502 Bad Gateway\r\n"));

    shutdown.close();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_malformed_request_over_tcp_gets_400() {
    let cfg = test_config("http://127.0.0.1:9");
    let (addr, shutdown, running) = start(&cfg).await;

    let response = send(addr, b"GET / HTTP/1.0\r\n\r\n").await;
    assert!(response.starts_with(b"HTTP/1.1 400 Bad Request\r\n"));

    shutdown.close();
    running.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_close_stops_accept_loop() {
    let cfg = test_config("http://127.0.0.1:9");
    let (_addr, shutdown, running) = start(&cfg).await;

    assert!(!shutdown.is_closed());
    shutdown.close();
    assert!(shutdown.is_closed());

    tokio::time::timeout(std::time::Duration::from_secs(5), running)
        .await
        .expect("accept loop did not stop")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn test_close_before_run_is_not_lost() {
    let cfg = test_config("http://127.0.0.1:9");
    let server = Server::bind(&cfg, Routes::new(&cfg).unwrap()).await.unwrap();
    server.shutdown_handle().close();

    tokio::time::timeout(std::time::Duration::from_secs(5), server.run())
        .await
        .expect("accept loop did not stop")
        .unwrap();
}
