//! WARC record formatting.
//!
//! An exchange becomes two records that reference each other through
//! `WARC-Concurrent-To`:
//!
//! ```text
//! WARC/1.0\r\n
//! WARC-Type: request\r\n
//! ...named fields...\r\n
//! Content-Length: <len(header block)>\r\n
//! \r\n
//! <request header block>\r\n\r\n
//!
//! WARC/1.0\r\n
//! WARC-Type: response\r\n
//! ...named fields...\r\n
//! Content-Length: <len(header block) + len(body) + 2>\r\n
//! \r\n
//! <response header block><body>\r\n\r\n\r\n
//! ```
//!
//! A header block is an HTTP message head ending in an empty line. The raw
//! header text captured by the browser is used when present; otherwise the
//! head is synthesized from the structured fields. Field order in a
//! synthesized head follows map iteration order and is not stable.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};
use data_encoding::BASE32;
use sha1::{Digest, Sha1};
use url::Url;

use crate::browser::Exchange;
use crate::error::{Error, Result};
use crate::identifiers::RecordId;
use crate::protocol::Headers;

// ============================================================================
// Constants
// ============================================================================

/// Version line opening every record.
pub const WARC_VERSION: &str = "WARC/1.0";

/// Line separator.
pub const CRLF: &str = "\r\n";

/// Separator written after every record block.
pub const RECORD_TERMINATOR: &str = "\r\n\r\n";

/// Content type of request records.
pub const REQUEST_CONTENT_TYPE: &str = "application/http; msgtype=request";

/// Content type of response records.
pub const RESPONSE_CONTENT_TYPE: &str = "application/http; msgtype=response";

// ============================================================================
// RecordType
// ============================================================================

/// Kind of a WARC record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// HTTP request half.
    Request,
    /// HTTP response half.
    Response,
}

impl RecordType {
    /// Returns the `WARC-Type` value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
        }
    }

    /// Returns the record's `Content-Type`.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Request => REQUEST_CONTENT_TYPE,
            Self::Response => RESPONSE_CONTENT_TYPE,
        }
    }
}

// ============================================================================
// RecordHeader
// ============================================================================

/// Named fields of one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    /// Record kind.
    pub record_type: RecordType,
    /// URI the record is about.
    pub target_uri: String,
    /// Capture timestamp (RFC 3339, UTC).
    pub date: String,
    /// This record's ID.
    pub record_id: RecordId,
    /// The paired record's ID.
    pub concurrent_to: RecordId,
    /// Server address, responses only.
    pub ip_address: Option<String>,
    /// `sha1:<base32>` of the body, responses only.
    pub payload_digest: Option<String>,
}

impl RecordHeader {
    /// Appends the version line and named fields for a block of
    /// `content_length` bytes, up to and including the empty line.
    pub fn write_to(&self, out: &mut Vec<u8>, content_length: usize) {
        let mut head = String::with_capacity(384);
        // Writing into a String cannot fail.
        let _ = write!(head, "{WARC_VERSION}{CRLF}");
        let _ = write!(head, "WARC-Type: {}{CRLF}", self.record_type.as_str());
        let _ = write!(head, "WARC-Target-URI: {}{CRLF}", self.target_uri);
        let _ = write!(head, "WARC-Date: {}{CRLF}", self.date);
        let _ = write!(head, "WARC-Record-ID: <{}>{CRLF}", self.record_id);
        let _ = write!(head, "WARC-Concurrent-To: <{}>{CRLF}", self.concurrent_to);
        if let Some(ip) = &self.ip_address {
            let _ = write!(head, "WARC-IP-Address: {ip}{CRLF}");
        }
        if let Some(digest) = &self.payload_digest {
            let _ = write!(head, "WARC-Payload-Digest: {digest}{CRLF}");
        }
        let _ = write!(head, "Content-Type: {}{CRLF}", self.record_type.content_type());
        let _ = write!(head, "Content-Length: {content_length}{CRLF}{CRLF}");
        out.extend_from_slice(head.as_bytes());
    }
}

// ============================================================================
// ExchangeRecords
// ============================================================================

/// The formatted request/response record pair of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRecords {
    /// ID of the request record.
    pub request_id: RecordId,
    /// ID of the response record.
    pub response_id: RecordId,
    /// Both records, request first, each followed by its terminator.
    pub bytes: Vec<u8>,
}

/// Formats an exchange as a request record followed by a response record.
///
/// # Errors
///
/// Returns [`Error::Archive`] if the exchange has no target URI.
pub fn format_exchange(exchange: &Exchange, captured_at: DateTime<Utc>) -> Result<ExchangeRecords> {
    let target_uri = exchange.target_uri();
    if target_uri.is_empty() {
        return Err(Error::archive(format!(
            "exchange {} has no target URI",
            exchange.request_id
        )));
    }

    let date = warc_date(captured_at);
    let request_id = RecordId::generate();
    let response_id = RecordId::generate();

    let request_block = request_header_block(exchange);
    let response_head = response_header_block(exchange);

    let mut bytes = Vec::with_capacity(
        1024 + request_block.len() + response_head.len() + exchange.body.len(),
    );

    RecordHeader {
        record_type: RecordType::Request,
        target_uri: target_uri.to_string(),
        date: date.clone(),
        record_id: request_id,
        concurrent_to: response_id,
        ip_address: None,
        payload_digest: None,
    }
    .write_to(&mut bytes, request_block.len());
    bytes.extend_from_slice(request_block.as_bytes());
    bytes.extend_from_slice(RECORD_TERMINATOR.as_bytes());

    let ip_address = non_empty(exchange.response.remote_ip_address.as_deref());
    RecordHeader {
        record_type: RecordType::Response,
        target_uri: target_uri.to_string(),
        date,
        record_id: response_id,
        concurrent_to: request_id,
        ip_address: ip_address.map(str::to_string),
        payload_digest: Some(payload_digest(&exchange.body)),
    }
    .write_to(&mut bytes, response_head.len() + exchange.body.len() + CRLF.len());
    bytes.extend_from_slice(response_head.as_bytes());
    bytes.extend_from_slice(&exchange.body);
    bytes.extend_from_slice(CRLF.as_bytes());
    bytes.extend_from_slice(RECORD_TERMINATOR.as_bytes());

    Ok(ExchangeRecords {
        request_id,
        response_id,
        bytes,
    })
}

// ============================================================================
// Header Blocks
// ============================================================================

/// Returns the HTTP request head of an exchange.
#[must_use]
pub fn request_header_block(exchange: &Exchange) -> String {
    if let Some(raw) = non_empty(exchange.response.request_headers_text.as_deref()) {
        return terminate_head(raw);
    }

    let request = &exchange.request;
    let method = if request.method.is_empty() {
        "GET"
    } else {
        &request.method
    };
    let headers = exchange
        .response
        .request_headers
        .as_ref()
        .unwrap_or(&request.headers);

    let mut head = format!("{method} {} HTTP/1.1{CRLF}", origin_form(&request.url));
    push_headers(&mut head, headers);
    head.push_str(CRLF);
    head
}

/// Returns the HTTP response head of an exchange.
#[must_use]
pub fn response_header_block(exchange: &Exchange) -> String {
    let response = &exchange.response;
    if let Some(raw) = non_empty(response.headers_text.as_deref()) {
        return terminate_head(raw);
    }

    let mut head = format!(
        "{} {} {}{CRLF}",
        http_version(response.protocol.as_deref()),
        response.status,
        response.status_text
    );
    push_headers(&mut head, &response.headers);
    head.push_str(CRLF);
    head
}

/// Maps the browser's protocol string to a status-line version.
#[must_use]
pub fn http_version(protocol: Option<&str>) -> &'static str {
    match protocol {
        Some(p) if p.eq_ignore_ascii_case("http/1.0") => "HTTP/1.0",
        _ => "HTTP/1.1",
    }
}

/// Returns the path and query of a URL, as sent in a request line.
fn origin_form(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match parsed.query() {
            Some(query) => format!("{}?{query}", parsed.path()),
            None => parsed.path().to_string(),
        },
        Err(_) => url.to_string(),
    }
}

/// Appends `name: value` lines; a multi-line value becomes repeated fields.
fn push_headers(head: &mut String, headers: &Headers) {
    for (name, value) in headers {
        for line in value.split('\n') {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(line);
            head.push_str(CRLF);
        }
    }
}

/// Ensures raw header text ends with an empty line.
fn terminate_head(raw: &str) -> String {
    let mut head = raw.to_string();
    if head.ends_with("\r\n\r\n") {
        return head;
    }
    if head.ends_with(CRLF) {
        head.push_str(CRLF);
    } else {
        head.push_str("\r\n\r\n");
    }
    head
}

fn non_empty(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.is_empty())
}

// ============================================================================
// Digest and Date
// ============================================================================

/// Returns the `WARC-Payload-Digest` value of a body.
#[must_use]
pub fn payload_digest(body: &[u8]) -> String {
    let digest = Sha1::digest(body);
    format!("sha1:{}", BASE32.encode(&digest))
}

/// Formats a `WARC-Date` value.
#[must_use]
pub fn warc_date(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

// ============================================================================
// Tests
// ============================================================================
