use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::http::Transport;

use super::error::{InvalidInput, SessionError};
use super::request::{get_json_bounded, text_field};
use super::source::{CUSTOM_CODE, SourceSelection, is_named_code};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SearchResultItem {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) source_label: String,
    pub(crate) source: SourceSelection,
    pub(crate) cover_url: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) year: Option<String>,
    pub(crate) remarks: Option<String>,
}

pub(crate) fn search(
    transport: Arc<dyn Transport>,
    query: &str,
    source: &SourceSelection,
    limit: Duration,
) -> Result<Vec<SearchResultItem>, SessionError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(SessionError::InvalidInput(InvalidInput::EmptyQuery));
    }

    let params = vec![("wd".to_string(), query.to_string()), source.query_params()];
    let value = get_json_bounded(transport, "search", "/api/search", params, limit)?;
    let items = parse_search_items(&value, source)?;
    debug!(query, count = items.len(), "search completed");
    Ok(items)
}

pub(crate) fn parse_search_items(
    value: &Value,
    session_source: &SourceSelection,
) -> Result<Vec<SearchResultItem>, SessionError> {
    let list = value
        .get("list")
        .and_then(Value::as_array)
        .ok_or_else(|| SessionError::RequestFailed("response has no result list".to_string()))?;

    Ok(list
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| SearchResultItem {
            id: text_field(entry, "vod_id").unwrap_or_default(),
            title: text_field(entry, "vod_name").unwrap_or_default(),
            source_label: text_field(entry, "source_name").unwrap_or_default(),
            source: item_source(entry, session_source),
            cover_url: text_field(entry, "vod_pic").filter(|url| url.starts_with("http")),
            category: text_field(entry, "type_name"),
            year: text_field(entry, "vod_year"),
            remarks: text_field(entry, "vod_remarks"),
        })
        .collect())
}

fn item_source(entry: &Value, session_source: &SourceSelection) -> SourceSelection {
    match text_field(entry, "source_code") {
        Some(code) if code != CUSTOM_CODE && is_named_code(&code) => SourceSelection::Named(code),
        _ => session_source.clone(),
    }
}
