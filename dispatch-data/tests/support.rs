//! One-shot HTTP server standing in for GraphHopper.

use std::{
    io::{BufRead, BufReader, Write},
    net::{SocketAddr, TcpListener},
    thread::{self, JoinHandle},
    time::Duration,
};

/// Canned reply served to the first connection.
#[derive(Debug, Clone)]
pub struct CannedReply {
    /// Status line suffix, e.g. `"200 OK"`.
    pub status: &'static str,
    /// JSON body.
    pub body: String,
    /// Pause before replying.
    pub delay: Duration,
}

impl CannedReply {
    /// Successful reply with `body`.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: "200 OK",
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Reply with an arbitrary status.
    pub fn status(status: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    /// Delay the reply.
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Server that answers one request and reports its request line.
#[derive(Debug)]
pub struct FakeGraphHopper {
    addr: SocketAddr,
    handle: JoinHandle<String>,
}

impl FakeGraphHopper {
    /// Bind to an ephemeral local port and serve `reply` once.
    pub fn serve(reply: CannedReply) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake server");
        let addr = listener.local_addr().expect("local address");
        let handle = thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return String::new();
            };
            let mut reader = BufReader::new(stream);
            let mut request_line = String::new();
            reader.read_line(&mut request_line).ok();
            let mut header = String::new();
            while reader.read_line(&mut header).is_ok_and(|n| n > 2) {
                header.clear();
            }
            thread::sleep(reply.delay);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                reply.status,
                reply.body.len(),
                reply.body
            );
            reader.get_mut().write_all(response.as_bytes()).ok();
            request_line.trim_end().to_owned()
        });
        Self { addr, handle }
    }

    /// Base URL to configure the provider with.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Wait for the request and return its request line.
    pub fn request_line(self) -> String {
        self.handle.join().expect("fake server thread")
    }
}

/// Base URL of a local port nothing listens on.
pub fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind free port");
    let addr = listener.local_addr().expect("local address");
    drop(listener);
    format!("http://{addr}")
}
