#![allow(dead_code)]

use std::net::SocketAddr;

use joinpoint::{Error, Router, Server};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub struct Running {
    pub addr: SocketAddr,
    pub stop: oneshot::Sender<()>,
    pub handle: JoinHandle<Result<(), Error>>,
}

/// Serves `router` on an ephemeral localhost port until `stop` fires.
pub async fn spawn(router: Router) -> Running {
    let server = Server::bind("127.0.0.1:0").await.expect("bind");
    run(server, router)
}

/// Like [`spawn`], with a request body cap.
pub async fn spawn_with_max_body(router: Router, max_body: usize) -> Running {
    let server = Server::bind("127.0.0.1:0").await.expect("bind").max_body(max_body);
    run(server, router)
}

fn run(server: Server, router: Router) -> Running {
    let addr = server.local_addr().expect("local addr");
    let (stop, stopped) = oneshot::channel::<()>();
    let handle = tokio::spawn(server.serve_with_shutdown(router, async {
        let _ = stopped.await;
    }));
    Running { addr, stop, handle }
}

pub struct Reply {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// One HTTP/1.1 request on a fresh connection, read until the server closes.
pub async fn send(addr: SocketAddr, method: &str, target: &str, body: &str) -> Reply {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    let head = format!(
        "{method} {target} HTTP/1.1\r\nhost: {addr}\r\nconnection: close\r\ncontent-length: {}\r\n\r\n",
        body.len(),
    );
    stream.write_all(head.as_bytes()).await.expect("write head");
    stream.write_all(body.as_bytes()).await.expect("write body");

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.expect("read reply");

    let split = raw.windows(4).position(|w| w == b"\r\n\r\n").expect("end of head");
    parse(&raw[..split], &raw[split + 4..])
}

fn parse(head: &[u8], body: &[u8]) -> Reply {
    let head = std::str::from_utf8(head).expect("utf-8 head");
    let mut lines = head.split("\r\n");
    let status = lines.next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .expect("status line");
    let headers = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .collect();

    Reply { status, headers, body: body.to_vec() }
}

/// One request on a connection that stays open afterwards. Reads exactly
/// one response, sized by its `content-length`.
pub async fn send_keep_alive(stream: &mut TcpStream, method: &str, target: &str) -> Reply {
    let head = format!("{method} {target} HTTP/1.1\r\nhost: test\r\ncontent-length: 0\r\n\r\n");
    stream.write_all(head.as_bytes()).await.expect("write head");

    let mut raw = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.expect("read reply");
        assert!(n > 0, "connection closed before a full response");
        raw.extend_from_slice(&chunk[..n]);

        let Some(split) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let reply = parse(&raw[..split], &[]);
        let length: usize = reply.header("content-length")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);
        if raw.len() >= split + 4 + length {
            return parse(&raw[..split], &raw[split + 4..split + 4 + length]);
        }
    }
}
