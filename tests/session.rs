//! End-to-end page session tests against a scripted browser endpoint.

mod common;

// ============================================================================
// Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::StreamExt;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use cdp_crawler::{BrowseOutcome, Error, Exchange, PageSession, SessionOptions, WarcWriter};
use common::{
    FakeBrowser, FakePage, load_event_fired, loading_failed, loading_finished, parse_warc,
    raw_pair, request_will_be_sent, response_received, send_json,
};

// ============================================================================
// Constants
// ============================================================================

const HOME: &str = "http://site.test/";
const BODY: &str = "<html><body>hello</body></html>";

// ============================================================================
// Helpers
// ============================================================================

fn options() -> SessionOptions {
    SessionOptions::new()
        .with_call_timeout(Duration::from_secs(2))
        .with_visit_timeout(Duration::from_secs(3))
}

async fn browser(pages: Vec<(&str, FakePage)>) -> FakeBrowser {
    let pages: HashMap<String, FakePage> = pages
        .into_iter()
        .map(|(url, page)| (url.to_string(), page))
        .collect();
    FakeBrowser::start(pages).await
}

fn collect_exchanges(session: &mut PageSession) -> Arc<Mutex<Vec<Exchange>>> {
    let exchanges = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&exchanges);
    session.set_exchange_handler(move |exchange| {
        sink.lock().push(exchange.clone());
        Ok(())
    });
    exchanges
}

fn from_loader(mut event: Value, loader_id: &str) -> Value {
    event["params"]["loaderId"] = json!(loader_id);
    event
}

/// Browser whose blank page reports its load only after the next navigation
/// has started, with the failed page's error document loading in between.
async fn serve_late_reset_loads(mut ws: WebSocketStream<TcpStream>) {
    let mut reset_load_pending = false;

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(call) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        let params = &call["params"];
        let mut events = Vec::new();

        let result = match call["method"].as_str().unwrap_or_default() {
            "Page.navigate" => match params["url"].as_str().unwrap_or_default() {
                "http://a.test/" => {
                    events.push(from_loader(request_will_be_sent("R1", "http://a.test/"), "LA"));
                    events.push(loading_failed("R1", "net::ERR_CONNECTION_RESET"));
                    // The error document finishes loading.
                    events.push(load_event_fired());
                    json!({"frameId": "F1", "loaderId": "LA"})
                }
                "http://b.test/" => {
                    if std::mem::take(&mut reset_load_pending) {
                        events.push(load_event_fired());
                    }
                    events.push(from_loader(request_will_be_sent("R2", "http://b.test/"), "LB"));
                    events.push(response_received("R2", "http://b.test/", 200, "text/html"));
                    events.push(loading_finished("R2"));
                    events.push(load_event_fired());
                    json!({"frameId": "F1", "loaderId": "LB"})
                }
                _ => {
                    reset_load_pending = true;
                    json!({"frameId": "F1"})
                }
            },
            "Network.getResponseBody" => json!({"body": "abc", "base64Encoded": false}),
            "Runtime.evaluate" => {
                let expression = params["expression"].as_str().unwrap_or_default();
                let value = if expression.contains("querySelectorAll") {
                    json!(r#"["http://b.test/next"]"#)
                } else {
                    json!("b")
                };
                json!({"result": {"type": "string", "value": value}})
            }
            _ => json!({}),
        };

        send_json(&mut ws, json!({"id": call["id"], "result": result})).await;
        for event in events {
            send_json(&mut ws, event).await;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_visit_archives_document_and_extracts() {
    let page = FakePage::document(HOME, BODY)
        .with_links(&["", "http://site.test/a"])
        .with_text("hello");
    let browser = browser(vec![(HOME, page)]).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("crawl.warc");

    let mut session = browser.session(options()).await;
    session.set_exchange_handler(WarcWriter::create(&path).expect("warc").into_handler());

    let visit = match session.browse(HOME).await {
        BrowseOutcome::Visited(visit) => visit,
        other => panic!("expected a visit, got {other}"),
    };

    assert_eq!(visit.url, HOME);
    assert_eq!(visit.status, 200);
    assert_eq!(visit.mime_type, "text/html");
    assert_eq!(visit.links, vec!["http://site.test/a"]);
    assert_eq!(visit.dom_text, "hello");
    assert_eq!(visit.total_bytes, BODY.len() as u64);

    let records = parse_warc(&std::fs::read(&path).expect("read archive"));
    assert_eq!(records.len(), 2);

    let (request, response) = (&records[0], &records[1]);
    assert_eq!(request.field("WARC-Type"), Some("request"));
    assert_eq!(response.field("WARC-Type"), Some("response"));
    assert_eq!(request.field("WARC-Target-URI"), Some(HOME));
    assert_eq!(request.field("WARC-Concurrent-To"), response.field("WARC-Record-ID"));
    assert_eq!(response.field("WARC-Concurrent-To"), request.field("WARC-Record-ID"));
    assert_eq!(response.field("WARC-IP-Address"), Some("127.0.0.1"));

    let request_block = String::from_utf8(request.block.clone()).expect("utf8");
    assert!(request_block.starts_with("GET / HTTP/1.1\r\n"));
    assert!(request_block.ends_with("\r\n\r\n"));

    let response_block = String::from_utf8(response.block.clone()).expect("utf8");
    assert!(response_block.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response_block.ends_with(&format!("\r\n\r\n{BODY}\r\n")));
}

#[tokio::test]
async fn test_page_is_reset_after_visit() {
    let browser = browser(vec![(HOME, FakePage::document(HOME, BODY))]).await;
    let mut session = browser.session(options()).await;

    assert!(session.browse(HOME).await.is_visited());

    let navigations = browser.params_of("Page.navigate");
    assert_eq!(navigations.len(), 2);
    assert_eq!(navigations[0]["url"], HOME);
    assert_eq!(navigations[1]["url"], "about:blank");
}

#[tokio::test]
async fn test_primary_load_failure_fails_visit() {
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            loading_failed("R1", "net::ERR_NAME_NOT_RESOLVED"),
        ],
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;

    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("crawl.warc");

    let mut session = browser.session(options()).await;
    session.set_exchange_handler(WarcWriter::create(&path).expect("warc").into_handler());

    match session.browse(HOME).await {
        BrowseOutcome::Failed(Error::NavigationFailed { url, reason }) => {
            assert_eq!(url, HOME);
            assert_eq!(reason, "net::ERR_NAME_NOT_RESOLVED");
        }
        other => panic!("expected navigation failure, got {other}"),
    }

    assert!(std::fs::read(&path).expect("read archive").is_empty());
    assert_eq!(browser.params_of("Page.navigate").last().expect("reset")["url"], "about:blank");
}

#[tokio::test]
async fn test_navigate_error_text_fails_visit() {
    let page = FakePage {
        navigate_error: Some("net::ERR_CONNECTION_REFUSED".into()),
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;

    let outcome = session.browse(HOME).await;
    assert!(matches!(
        outcome,
        BrowseOutcome::Failed(Error::NavigationFailed { .. })
    ));
}

#[tokio::test]
async fn test_missing_load_event_times_out() {
    let hanging = FakePage {
        events: vec![request_will_be_sent("R1", HOME)],
        ..Default::default()
    };
    let next = "http://site.test/next";
    let browser = browser(vec![(HOME, hanging), (next, FakePage::document(next, BODY))]).await;

    let mut session = browser
        .session(options().with_visit_timeout(Duration::from_millis(300)))
        .await;

    match session.browse(HOME).await {
        BrowseOutcome::TimedOut { url, timeout_ms } => {
            assert_eq!(url, HOME);
            assert_eq!(timeout_ms, 300);
        }
        other => panic!("expected a timeout, got {other}"),
    }

    // The session stays usable for the next page.
    let visit = session.browse(next).await.into_result().expect("second visit");
    assert_eq!(visit.status, 200);
}

#[tokio::test]
async fn test_total_bytes_sums_all_exchanges() {
    let script = "console.log(1);";
    let image = [0x89u8, b'P', b'N', b'G', 0, 255];
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            response_received("R1", HOME, 200, "text/html"),
            request_will_be_sent("R2", "http://site.test/app.js"),
            request_will_be_sent("R3", "http://site.test/logo.png"),
            loading_finished("R1"),
            response_received("R3", "http://site.test/logo.png", 200, "image/png"),
            response_received("R2", "http://site.test/app.js", 200, "text/javascript"),
            loading_finished("R3"),
            loading_finished("R2"),
            load_event_fired(),
        ],
        bodies: HashMap::from([
            ("R1".to_string(), (BODY.to_string(), false)),
            ("R2".to_string(), (script.to_string(), false)),
            ("R3".to_string(), (BASE64.encode(image), true)),
        ]),
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;
    let exchanges = collect_exchanges(&mut session);

    let visit = session.browse(HOME).await.into_result().expect("visit");

    let exchanges = exchanges.lock();
    let total: usize = exchanges.iter().map(|e| e.body.len()).sum();
    assert_eq!(visit.total_bytes, total as u64);
    assert_eq!(visit.total_bytes, (BODY.len() + script.len() + image.len()) as u64);

    let order: Vec<&str> = exchanges.iter().map(|e| e.request_id.as_str()).collect();
    assert_eq!(order, ["R1", "R3", "R2"]);
    assert_eq!(exchanges[1].body, image);
}

#[tokio::test]
async fn test_no_exchange_without_response() {
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            response_received("R1", HOME, 200, "text/html"),
            request_will_be_sent("R2", "http://site.test/beacon"),
            loading_finished("R2"),
            loading_finished("R1"),
            load_event_fired(),
        ],
        bodies: HashMap::from([
            ("R1".to_string(), (BODY.to_string(), false)),
            ("R2".to_string(), ("ignored".to_string(), false)),
        ]),
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;
    let exchanges = collect_exchanges(&mut session);

    let visit = session.browse(HOME).await.into_result().expect("visit");

    let exchanges = exchanges.lock();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].request_id.as_str(), "R1");
    assert_eq!(visit.total_bytes, BODY.len() as u64);

    let fetched = browser.params_of("Network.getResponseBody");
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0]["requestId"], "R1");
}

#[tokio::test]
async fn test_duplicate_finish_produces_one_exchange() {
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            response_received("R1", HOME, 200, "text/html"),
            loading_finished("R1"),
            loading_finished("R1"),
            load_event_fired(),
        ],
        bodies: HashMap::from([("R1".to_string(), (BODY.to_string(), false))]),
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;
    let exchanges = collect_exchanges(&mut session);

    session.browse(HOME).await.into_result().expect("visit");
    assert_eq!(exchanges.lock().len(), 1);
}

#[tokio::test]
async fn test_unavailable_body_skips_exchange() {
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            response_received("R1", HOME, 200, "text/html"),
            request_will_be_sent("R2", "http://site.test/evicted.css"),
            response_received("R2", "http://site.test/evicted.css", 200, "text/css"),
            loading_finished("R2"),
            loading_finished("R1"),
            load_event_fired(),
        ],
        bodies: HashMap::from([("R1".to_string(), (BODY.to_string(), false))]),
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;
    let exchanges = collect_exchanges(&mut session);

    let visit = session.browse(HOME).await.into_result().expect("visit");
    assert_eq!(exchanges.lock().len(), 1);
    assert_eq!(visit.total_bytes, BODY.len() as u64);
}

#[tokio::test]
async fn test_primary_status_comes_from_first_request() {
    let page = FakePage {
        events: vec![
            request_will_be_sent("R1", HOME),
            request_will_be_sent("R2", "http://site.test/style.css"),
            response_received("R2", "http://site.test/style.css", 200, "text/css"),
            response_received("R1", HOME, 404, "text/html"),
            load_event_fired(),
        ],
        ..Default::default()
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;

    let visit = session.browse(HOME).await.into_result().expect("visit");
    assert_eq!(visit.status, 404);
    assert_eq!(visit.mime_type, "text/html");
    assert_eq!(visit.total_bytes, 0);
}

#[tokio::test]
async fn test_script_exception_fails_visit() {
    let page = FakePage {
        script_throws: true,
        ..FakePage::document(HOME, BODY)
    };
    let browser = browser(vec![(HOME, page)]).await;
    let mut session = browser.session(options()).await;

    match session.browse(HOME).await {
        BrowseOutcome::Failed(Error::ScriptError { message }) => {
            assert_eq!(message, "TypeError: boom");
        }
        other => panic!("expected a script error, got {other}"),
    }
}

#[tokio::test]
async fn test_handler_error_fails_visit() {
    let browser = browser(vec![(HOME, FakePage::document(HOME, BODY))]).await;
    let mut session = browser.session(options()).await;
    session.set_exchange_handler(|_| Err(Error::archive("disk full")));

    let outcome = session.browse(HOME).await;
    assert!(matches!(outcome, BrowseOutcome::Failed(Error::Archive { .. })));
}

#[tokio::test]
async fn test_second_session_on_same_client_is_rejected() {
    let browser = browser(vec![]).await;
    let client = browser.client(&options()).await;

    let first = PageSession::new(client.clone(), options());
    assert!(first.is_ok());

    let second = PageSession::new(client, options());
    assert!(matches!(second, Err(Error::Config { .. })));
}

#[tokio::test]
async fn test_late_load_events_do_not_complete_next_visit() {
    let options = SessionOptions::new()
        .with_call_timeout(Duration::from_millis(300))
        .with_visit_timeout(Duration::from_secs(3));
    let (client, server) = raw_pair(options.client_config()).await;
    tokio::spawn(serve_late_reset_loads(server));

    let mut session = PageSession::new(client, options).expect("session");
    let exchanges = collect_exchanges(&mut session);

    match session.browse("http://a.test/").await {
        BrowseOutcome::Failed(Error::NavigationFailed { reason, .. }) => {
            assert_eq!(reason, "net::ERR_CONNECTION_RESET");
        }
        other => panic!("expected navigation failure, got {other}"),
    }

    let visit = session
        .browse("http://b.test/")
        .await
        .into_result()
        .expect("second visit");
    assert_eq!(visit.status, 200);
    assert_eq!(visit.mime_type, "text/html");
    assert_eq!(visit.total_bytes, 3);
    assert_eq!(visit.links, vec!["http://b.test/next"]);

    let exchanges = exchanges.lock();
    assert_eq!(exchanges.len(), 1);
    assert_eq!(exchanges[0].request_id.as_str(), "R2");
}
