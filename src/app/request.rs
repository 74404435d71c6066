use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::http::Transport;

use super::deadline::{Raced, race};
use super::error::SessionError;

const REJECTED_CODE: i64 = 400;

pub(crate) fn get_json_bounded(
    transport: Arc<dyn Transport>,
    label: &'static str,
    path: &'static str,
    query: Vec<(String, String)>,
    limit: Duration,
) -> Result<Value, SessionError> {
    info!(operation = label, path, "dispatching request");
    let body = match race(label, limit, move || transport.get_text(path, &query)) {
        Raced::Settled(result) => result.inspect_err(|err| {
            warn!(operation = label, "request failed: {err}");
        })?,
        Raced::TimedOut => {
            warn!(operation = label, limit_ms = limit.as_millis() as u64, "request timed out");
            return Err(SessionError::Timeout);
        }
        Raced::Lost => {
            return Err(SessionError::RequestFailed(
                "request worker stopped unexpectedly".to_string(),
            ));
        }
    };

    let value: Value = serde_json::from_str(&body)
        .map_err(|err| SessionError::RequestFailed(format!("malformed response: {err}")))?;
    if response_code(&value) == Some(REJECTED_CODE) {
        let msg = value
            .get("msg")
            .and_then(Value::as_str)
            .map(str::to_string);
        return Err(SessionError::QueryRejected(msg));
    }
    Ok(value)
}

pub(crate) fn response_code(value: &Value) -> Option<i64> {
    match value.get("code")? {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

pub(crate) fn text_field(value: &Value, key: &str) -> Option<String> {
    let text = match value.get(key)? {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
