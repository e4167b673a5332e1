//! Streaming passthrough from an upstream body to a client body.
//!
//! A pump task reads upstream chunks into a bounded channel; the client body
//! drains it. When the channel is full the pump stops reading, so the
//! upstream is never read faster than the client consumes and at most
//! `buffer_chunks` chunks are held per stream. When the client goes away
//! the receiver is dropped, the pump notices via `Sender::closed` and exits,
//! which drops the upstream response and frees its connection.

use axum::body::{Body, Bytes};
use futures_util::stream;
use std::io;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use crate::metrics;

type Chunk = Result<Bytes, io::Error>;

/// Start relaying `upstream` and return the body to send to the client.
///
/// The pump runs on `tracker` so shutdown can wait for in-flight relays.
pub fn relay_body(upstream: reqwest::Response, buffer_chunks: usize, tracker: &TaskTracker) -> Body {
    let (tx, rx) = mpsc::channel::<Chunk>(buffer_chunks.max(1));

    tracker.spawn(pump(upstream, tx));

    let chunks = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });

    Body::from_stream(chunks)
}

async fn pump(mut upstream: reqwest::Response, tx: mpsc::Sender<Chunk>) {
    let url = upstream.url().clone();
    let mut relayed = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!("Client went away after {} bytes, abandoning relay of {}", relayed, url);
                return;
            }
            next = upstream.chunk() => next,
        };

        match next {
            Ok(Some(bytes)) => {
                let len = bytes.len();
                if tx.send(Ok(bytes)).await.is_err() {
                    debug!("Client went away after {} bytes, abandoning relay of {}", relayed, url);
                    return;
                }
                relayed += len;
                metrics::record_relayed_bytes(len);
            }
            Ok(None) => {
                debug!("Relayed {} bytes from {}", relayed, url);
                return;
            }
            Err(e) => {
                warn!("Upstream body failed after {} bytes from {}: {}", relayed, url, e);
                metrics::record_upstream_error();
                let _ = tx.send(Err(io::Error::other(e))).await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn upstream_with(body: Vec<u8>) -> (MockServer, reqwest::Response) {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "video/mp2t"))
            .mount(&server)
            .await;
        let response = reqwest::get(server.uri()).await.unwrap();
        (server, response)
    }

    #[tokio::test]
    async fn relays_every_byte_in_order() {
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let (_server, response) = upstream_with(payload.clone()).await;
        let tracker = TaskTracker::new();

        let body = relay_body(response, 2, &tracker);
        let collected = body.collect().await.unwrap().to_bytes();

        assert_eq!(collected.as_ref(), payload.as_slice());

        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("pump should finish once the upstream ends");
    }

    #[tokio::test]
    async fn dropping_client_body_stops_the_pump() {
        let (_server, response) = upstream_with(vec![1u8; 4 * 1024 * 1024]).await;
        let tracker = TaskTracker::new();

        let body = relay_body(response, 1, &tracker);
        drop(body);

        tracker.close();
        tokio::time::timeout(Duration::from_secs(5), tracker.wait())
            .await
            .expect("pump should exit after the client disconnects");
    }

    /// Raw HTTP/1.1 upstream that promises `advertised` bytes, sends `sent`,
    /// then holds the socket open for `hold` before closing it.
    async fn short_upstream(advertised: usize, sent: usize, hold: Duration) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 4096];
            let _ = socket.read(&mut request).await;

            let head = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: video/mp2t\r\ncontent-length: {advertised}\r\n\r\n"
            );
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&vec![0x47u8; sent]).await.unwrap();
            socket.flush().await.unwrap();

            tokio::time::sleep(hold).await;
        });

        format!("http://{addr}/seg.ts")
    }

    #[tokio::test]
    async fn truncated_upstream_aborts_the_client_body() {
        let url = short_upstream(1000, 100, Duration::ZERO).await;
        let response = reqwest::get(url).await.unwrap();
        let tracker = TaskTracker::new();

        let body = relay_body(response, 2, &tracker);
        let collected = tokio::time::timeout(Duration::from_secs(5), body.collect())
            .await
            .expect("relay should end once the upstream closes");

        assert!(collected.is_err(), "short body must not look complete");
    }

    #[tokio::test]
    async fn stalled_upstream_hits_the_read_timeout() {
        let url = short_upstream(1000, 100, Duration::from_secs(30)).await;
        let config = crate::config::Config {
            upstream_read_timeout_secs: 1,
            ..crate::config::Config::default()
        };
        let client = crate::upstream::UpstreamClient::new(&config).unwrap();
        let target = url::Url::parse(&url).unwrap();

        let upstream = client.fetch(&target, None).await.unwrap();
        let tracker = TaskTracker::new();
        let body = upstream.into_body(2, &tracker);

        let collected = tokio::time::timeout(Duration::from_secs(10), body.collect())
            .await
            .expect("read timeout should fire well before the upstream closes");

        assert!(collected.is_err());
    }

    #[tokio::test]
    async fn zero_buffer_is_clamped() {
        let (_server, response) = upstream_with(b"abc".to_vec()).await;
        let tracker = TaskTracker::new();

        let body = relay_body(response, 0, &tracker);
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.as_ref(), b"abc");
    }
}
