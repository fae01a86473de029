#![allow(dead_code)]

use async_trait::async_trait;
use dex_arb_monitor::config::VenueConfig;
use dex_arb_monitor::dex::{QueryClient, VenueAdapter};
use dex_arb_monitor::error::{ArbError, Result};
use dex_arb_monitor::notification::NotificationSink;
use dex_arb_monitor::utils::{now_unix, PricePoint, TokenPair};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// What the stub server does with one incoming request.
#[derive(Debug, Clone)]
pub enum StubReply {
    Json(u16, String),
    /// Read the request, then close the socket without answering.
    Drop,
}

/// Minimal HTTP/1.1 responder: answers successive connections with `replies`
/// in order (the last one repeats) and records every request body.
pub async fn spawn_http_stub(replies: Vec<StubReply>) -> (String, Arc<Mutex<Vec<String>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    let bodies = Arc::new(Mutex::new(Vec::new()));
    let recorded = bodies.clone();

    tokio::spawn(async move {
        let mut served = 0usize;
        loop {
            let (mut socket, _) = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let body = read_request(&mut socket).await;
            recorded.lock().unwrap().push(body);

            let reply = replies
                .get(served)
                .or_else(|| replies.last())
                .cloned()
                .unwrap_or(StubReply::Drop);
            served += 1;

            if let StubReply::Json(status, payload) = reply {
                let response = format!(
                    "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    payload.len(),
                    payload
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        }
    });

    (url, bodies)
}

async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            return String::new();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
    let content_length = headers
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    String::from_utf8_lossy(&buf[header_end..]).to_string()
}

/// Collects every message instead of delivering it.
#[derive(Default)]
pub struct RecordingSink {
    pub messages: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    Price(f64),
    Absent,
    Fail,
    Panic,
}

/// Adapter that answers every pair with a fixed behavior.
pub struct ScriptedAdapter {
    id: String,
    behavior: Behavior,
}

impl ScriptedAdapter {
    pub fn new(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior,
        })
    }
}

#[async_trait]
impl VenueAdapter for ScriptedAdapter {
    fn venue_id(&self) -> &str {
        &self.id
    }

    async fn fetch_price(
        &self,
        _client: &QueryClient,
        venue: &VenueConfig,
        pair: &TokenPair,
    ) -> Result<Option<PricePoint>> {
        match self.behavior {
            Behavior::Price(price) => Ok(Some(PricePoint::new(&venue.id, pair, price, 1_000.0, now_unix()))),
            Behavior::Absent => Ok(None),
            Behavior::Fail => Err(ArbError::TimeoutError(format!("{} timed out", venue.id))),
            Behavior::Panic => panic!("adapter {} blew up", venue.id),
        }
    }
}

pub fn venue(id: &str, fee_pct: f64) -> VenueConfig {
    VenueConfig::new(id, id, &format!("http://{}.invalid/", id), fee_pct)
}
