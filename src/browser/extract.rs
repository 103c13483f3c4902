//! In-page extraction scripts.
//!
//! Both scripts run in the page's main world through `Runtime.evaluate`
//! once the page has fired its `load` event.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Command;
use crate::transport::Client;

// ============================================================================
// Scripts
// ============================================================================

/// Collects resolved anchor targets as a JSON string.
///
/// Serialization runs with any page-installed `toJSON` overrides removed
/// (old prototype.js versions break `JSON.stringify` with them) and puts
/// them back afterwards.
pub const EXTRACT_LINKS_SCRIPT: &str = r#"
(function() {
    var anchors = document.querySelectorAll('a');
    var links = [];
    for (var i = 0; i < anchors.length; i++) {
        var href = anchors[i].href;
        if (typeof href === 'string' && href !== '') {
            links.push(href);
        }
    }

    var arrayToJSON = Array.prototype.toJSON;
    var stringToJSON = String.prototype.toJSON;
    delete Array.prototype.toJSON;
    delete String.prototype.toJSON;

    try {
        return JSON.stringify(links);
    } finally {
        if (arrayToJSON !== undefined) {
            Array.prototype.toJSON = arrayToJSON;
        }
        if (stringToJSON !== undefined) {
            String.prototype.toJSON = stringToJSON;
        }
    }
})()
"#;

/// Returns the rendered text of the document body.
pub const EXTRACT_TEXT_SCRIPT: &str = r#"
(function() {
    var body = document.body;
    return body ? body.innerText : '';
})()
"#;

// ============================================================================
// Extraction
// ============================================================================

/// Evaluates an expression and returns its value.
///
/// # Errors
///
/// - [`Error::ScriptError`] if the expression threw
/// - Any transport error from the call
pub async fn evaluate(client: &Client, expression: &str) -> Result<Value> {
    let result = client.call(Command::evaluate(expression)).await?;
    evaluation_value(result)
}

/// Runs the link extraction script.
///
/// # Errors
///
/// - [`Error::ScriptError`] if the script threw
/// - [`Error::UnexpectedResult`] if it did not produce a JSON string array
pub async fn extract_links(client: &Client) -> Result<Vec<String>> {
    let value = evaluate(client, EXTRACT_LINKS_SCRIPT).await?;
    let links = parse_links(&value)?;
    debug!(count = links.len(), "Links extracted");
    Ok(links)
}

/// Runs the text extraction script.
///
/// # Errors
///
/// - [`Error::ScriptError`] if the script threw
/// - [`Error::UnexpectedResult`] if it did not produce a string
pub async fn extract_text(client: &Client) -> Result<String> {
    let value = evaluate(client, EXTRACT_TEXT_SCRIPT).await?;
    match value {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        other => Err(Error::unexpected_result(
            "Runtime.evaluate",
            format!("text extraction returned {other}"),
        )),
    }
}

/// Unwraps a `Runtime.evaluate` result.
fn evaluation_value(mut result: Value) -> Result<Value> {
    if let Some(details) = result.get("exceptionDetails") {
        let message = details
            .pointer("/exception/description")
            .or_else(|| details.get("text"))
            .and_then(Value::as_str)
            .unwrap_or("uncaught exception")
            .to_string();
        return Err(Error::script_error(message));
    }

    Ok(result
        .pointer_mut("/result/value")
        .map(Value::take)
        .unwrap_or(Value::Null))
}

/// Decodes the link script's JSON string, dropping empty targets.
fn parse_links(value: &Value) -> Result<Vec<String>> {
    let json = value.as_str().ok_or_else(|| {
        Error::unexpected_result("Runtime.evaluate", "link extraction did not return a string")
    })?;

    let links: Vec<String> = serde_json::from_str(json).map_err(|e| {
        Error::unexpected_result("Runtime.evaluate", format!("bad link list: {e}"))
    })?;

    Ok(links.into_iter().filter(|link| !link.is_empty()).collect())
}

// ============================================================================
// Tests
// ============================================================================
