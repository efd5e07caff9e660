//! Raw HTTP server that sends image bodies in timed slices.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Serves `image/png` on every path and returns the base URL.
///
/// HEAD gets the headers only. GET gets `slices` copies of `slice`, with
/// `gap` between consecutive writes.
pub(crate) fn serve_trickled_image(
    listener: TcpListener,
    slices: usize,
    slice: &'static [u8],
    gap: Duration,
) -> String {
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(respond(stream, slices, slice, gap));
        }
    });
    base
}

async fn respond(mut stream: TcpStream, slices: usize, slice: &'static [u8], gap: Duration) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        slices * slice.len()
    );
    if stream.write_all(head.as_bytes()).await.is_err() || request.starts_with(b"HEAD") {
        return;
    }

    for i in 0..slices {
        if i > 0 {
            tokio::time::sleep(gap).await;
        }
        if stream.write_all(slice).await.is_err() || stream.flush().await.is_err() {
            return;
        }
    }
}
