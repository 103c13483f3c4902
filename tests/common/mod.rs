//! Shared utilities for integration tests.
//!
//! Provides a scripted stand-in for a browser's remote-debugging endpoint:
//! - `GET /json/list` target discovery over plain HTTP
//! - A WebSocket speaking enough of the protocol to drive a page session
//! - A WARC reader that re-parses archives by `Content-Length`

#![allow(dead_code)]

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use cdp_crawler::protocol::EventRegistry;
use cdp_crawler::{Client, ClientConfig, PageSession, SessionOptions};

// ============================================================================
// Event Builders
// ============================================================================

pub fn request_will_be_sent(request_id: &str, url: &str) -> Value {
    json!({
        "method": "Network.requestWillBeSent",
        "params": {
            "requestId": request_id,
            "loaderId": "L1",
            "documentURL": url,
            "request": {
                "url": url,
                "method": "GET",
                "headers": {"Accept": "text/html"}
            },
            "timestamp": 1.0,
            "wallTime": 1_700_000_000.0,
            "type": "Document"
        }
    })
}

pub fn response_received(request_id: &str, url: &str, status: u16, mime_type: &str) -> Value {
    let status_text = if status == 200 { "OK" } else { "Not Found" };
    json!({
        "method": "Network.responseReceived",
        "params": {
            "requestId": request_id,
            "timestamp": 1.1,
            "type": "Document",
            "response": {
                "url": url,
                "status": status,
                "statusText": status_text,
                "headers": {"Content-Type": mime_type},
                "mimeType": mime_type,
                "remoteIPAddress": "127.0.0.1",
                "remotePort": 80,
                "protocol": "http/1.1",
                "encodedDataLength": 120
            }
        }
    })
}

pub fn loading_finished(request_id: &str) -> Value {
    json!({
        "method": "Network.loadingFinished",
        "params": {"requestId": request_id, "timestamp": 1.2, "encodedDataLength": 120}
    })
}

pub fn loading_failed(request_id: &str, error_text: &str) -> Value {
    json!({
        "method": "Network.loadingFailed",
        "params": {
            "requestId": request_id,
            "timestamp": 1.2,
            "type": "Document",
            "errorText": error_text,
            "canceled": false
        }
    })
}

pub fn load_event_fired() -> Value {
    json!({"method": "Page.loadEventFired", "params": {"timestamp": 2.0}})
}

// ============================================================================
// FakePage
// ============================================================================

/// Scripted behavior of one URL.
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    /// Notifications pushed after the navigate reply, in order.
    pub events: Vec<Value>,
    /// Result of the link script.
    pub links: Vec<String>,
    /// Result of the text script.
    pub text: String,
    /// Bodies by request ID: (body, base64Encoded).
    pub bodies: HashMap<String, (String, bool)>,
    /// `errorText` of the navigate reply.
    pub navigate_error: Option<String>,
    /// Make the link script throw.
    pub script_throws: bool,
}

impl FakePage {
    /// A page whose document loads with one response and body.
    pub fn document(url: &str, body: &str) -> Self {
        Self {
            events: vec![
                request_will_be_sent("R1", url),
                response_received("R1", url, 200, "text/html"),
                loading_finished("R1"),
                load_event_fired(),
            ],
            bodies: HashMap::from([("R1".to_string(), (body.to_string(), false))]),
            ..Default::default()
        }
    }

    pub fn with_links(mut self, links: &[&str]) -> Self {
        self.links = links.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

// ============================================================================
// FakeBrowser
// ============================================================================

/// A scripted remote-debugging endpoint on a loopback port.
pub struct FakeBrowser {
    addr: SocketAddr,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl FakeBrowser {
    /// Starts serving the pages.
    ///
    /// Unknown URLs, including `about:blank`, load as empty pages.
    pub async fn start(pages: HashMap<String, FakePage>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let calls = Arc::new(Mutex::new(Vec::new()));
        let pages = Arc::new(pages);

        let log = Arc::clone(&calls);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve(stream, addr, Arc::clone(&pages), Arc::clone(&log)));
            }
        });

        Self { addr, calls }
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/devtools/page/TAB", self.addr)
    }

    /// Connects a client directly to the tab WebSocket.
    pub async fn client(&self, options: &SessionOptions) -> Client {
        Client::connect_with(&self.ws_url(), EventRegistry::standard(), options.client_config())
            .await
            .expect("connect")
    }

    /// Connects a page session directly to the tab WebSocket.
    pub async fn session(&self, options: SessionOptions) -> PageSession {
        let client = self.client(&options).await;
        PageSession::new(client, options).expect("session")
    }

    /// Returns every method called so far, in arrival order.
    pub fn methods(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| c["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Returns the params of every call of a method.
    pub fn params_of(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c["method"] == method)
            .map(|c| c.get("params").cloned().unwrap_or(Value::Null))
            .collect()
    }
}

async fn serve(
    stream: TcpStream,
    addr: SocketAddr,
    pages: Arc<HashMap<String, FakePage>>,
    calls: Arc<Mutex<Vec<Value>>>,
) {
    let mut probe = [0u8; 16];
    let mut seen = 0;
    for _ in 0..100 {
        seen = stream.peek(&mut probe).await.unwrap_or(0);
        if seen >= 9 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    if probe[..seen].starts_with(b"GET /json") {
        serve_target_list(stream, addr).await;
    } else if let Ok(ws) = accept_async(stream).await {
        serve_tab(ws, &pages, &calls).await;
    }
}

async fn serve_target_list(mut stream: TcpStream, addr: SocketAddr) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }

    let body = json!([
        {
            "id": "WORKER",
            "type": "service_worker",
            "title": "worker",
            "url": "http://site.test/sw.js"
        },
        {
            "id": "TAB",
            "type": "page",
            "title": "",
            "url": "about:blank",
            "webSocketDebuggerUrl": format!("ws://{addr}/devtools/page/TAB")
        }
    ])
    .to_string();

    let response = format!(
        "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

async fn serve_tab(
    mut ws: WebSocketStream<TcpStream>,
    pages: &HashMap<String, FakePage>,
    calls: &Mutex<Vec<Value>>,
) {
    let mut current = FakePage::default();

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(call) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        calls.lock().push(call.clone());

        let method = call["method"].as_str().unwrap_or_default();
        let params = &call["params"];
        let mut events = Vec::new();

        let reply: Result<Value, (i64, &str)> = match method {
            "Page.enable" | "Network.enable" | "Network.setBlockedURLs" => Ok(json!({})),
            "Target.createTarget" => Ok(json!({"targetId": "NEW"})),
            "Page.navigate" => {
                let url = params["url"].as_str().unwrap_or_default();
                match pages.get(url) {
                    Some(page) => {
                        current = page.clone();
                        events = page.events.clone();
                        match &page.navigate_error {
                            Some(error) => Ok(json!({"frameId": "F1", "errorText": error})),
                            None => Ok(json!({"frameId": "F1", "loaderId": "L1"})),
                        }
                    }
                    None => {
                        current = FakePage::default();
                        events.push(load_event_fired());
                        Ok(json!({"frameId": "F1"}))
                    }
                }
            }
            "Runtime.evaluate" => {
                let expression = params["expression"].as_str().unwrap_or_default();
                if expression.contains("querySelectorAll") {
                    if current.script_throws {
                        Ok(json!({
                            "result": {"type": "object", "subtype": "error"},
                            "exceptionDetails": {
                                "text": "Uncaught",
                                "exception": {"description": "TypeError: boom"}
                            }
                        }))
                    } else {
                        let links = serde_json::to_string(&current.links).unwrap_or_default();
                        Ok(json!({"result": {"type": "string", "value": links}}))
                    }
                } else {
                    Ok(json!({"result": {"type": "string", "value": current.text}}))
                }
            }
            "Network.getResponseBody" => {
                let request_id = params["requestId"].as_str().unwrap_or_default();
                match current.bodies.get(request_id) {
                    Some((body, encoded)) => Ok(json!({"body": body, "base64Encoded": encoded})),
                    None => Err((-32000, "No resource with given identifier found")),
                }
            }
            _ => Err((-32601, "method not found")),
        };

        let frame = match reply {
            Ok(result) => json!({"id": call["id"], "result": result}),
            Err((code, message)) => json!({"id": call["id"], "error": {"code": code, "message": message}}),
        };
        if ws.send(Message::Text(frame.to_string().into())).await.is_err() {
            return;
        }
        for event in events {
            if ws.send(Message::Text(event.to_string().into())).await.is_err() {
                return;
            }
        }
    }
}

// ============================================================================
// Raw Connection
// ============================================================================

/// Connects a client to a bare WebSocket whose server half the test drives.
pub async fn raw_pair(config: ClientConfig) -> (Client, WebSocketStream<TcpStream>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = format!("ws://{addr}/devtools/page/RAW");

    let server = async {
        let (stream, _) = listener.accept().await.expect("accept");
        accept_async(stream).await.expect("handshake")
    };
    let (client, server) = tokio::join!(
        Client::connect_with(&url, EventRegistry::standard(), config),
        server
    );
    (client.expect("connect"), server)
}

/// Reads the next call from the server half.
pub async fn next_call(ws: &mut WebSocketStream<TcpStream>) -> Value {
    loop {
        let message = ws.next().await.expect("open").expect("frame");
        if let Message::Text(text) = message {
            return serde_json::from_str(text.as_str()).expect("json call");
        }
    }
}

/// Sends a JSON frame from the server half.
pub async fn send_json(ws: &mut WebSocketStream<TcpStream>, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.expect("send");
}

// ============================================================================
// WARC Reader
// ============================================================================

/// One record re-parsed from an archive.
#[derive(Debug, Clone)]
pub struct WarcRecord {
    pub fields: Vec<(String, String)>,
    pub block: Vec<u8>,
}

impl WarcRecord {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Splits an archive into records, consuming exactly `Content-Length`
/// bytes of block and the record terminator each time.
pub fn parse_warc(mut data: &[u8]) -> Vec<WarcRecord> {
    let mut records = Vec::new();

    while !data.is_empty() {
        let head_end = data
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("record head terminator");
        let head = std::str::from_utf8(&data[..head_end]).expect("utf8 head");

        let mut lines = head.split("\r\n");
        assert_eq!(lines.next(), Some("WARC/1.0"));
        let fields: Vec<(String, String)> = lines
            .map(|line| {
                let (name, value) = line.split_once(": ").expect("named field");
                (name.to_string(), value.to_string())
            })
            .collect();

        let length: usize = fields
            .iter()
            .find(|(k, _)| k == "Content-Length")
            .expect("Content-Length")
            .1
            .parse()
            .expect("numeric length");

        let block_start = head_end + 4;
        let block = data[block_start..block_start + length].to_vec();
        let rest = &data[block_start + length..];
        assert!(rest.starts_with(b"\r\n\r\n"), "record terminator after block");
        data = &rest[4..];

        records.push(WarcRecord { fields, block });
    }

    records
}
