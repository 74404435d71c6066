use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::http::Transport;

use super::episode::EpisodeList;
use super::error::{InvalidInput, SessionError};
use super::request::{get_json_bounded, text_field};
use super::source::SourceSelection;

pub(crate) const UNKNOWN_TITLE: &str = "Unknown title";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TitleDetails {
    pub(crate) title: String,
    pub(crate) source_label: Option<String>,
    pub(crate) source: SourceSelection,
    pub(crate) episodes: EpisodeList,
}

impl TitleDetails {
    pub(crate) fn has_playable_video(&self) -> bool {
        !self.episodes.is_empty()
    }
}

pub(crate) fn fetch_details(
    transport: Arc<dyn Transport>,
    id: &str,
    source: &SourceSelection,
    title_hint: Option<&str>,
    limit: Duration,
) -> Result<TitleDetails, SessionError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(SessionError::InvalidInput(InvalidInput::MissingId));
    }

    let params = vec![("id".to_string(), id.to_string()), source.query_params()];
    let value = get_json_bounded(transport, "detail", "/api/detail", params, limit)?;
    let details = parse_details(&value, source, title_hint);
    debug!(id, episodes = details.episodes.len(), "details fetched");
    Ok(details)
}

pub(crate) fn parse_details(
    value: &Value,
    source: &SourceSelection,
    title_hint: Option<&str>,
) -> TitleDetails {
    let video_info = value.get("videoInfo");
    let title = title_hint
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(str::to_string)
        .or_else(|| video_info.and_then(|info| text_field(info, "title")))
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string());
    let source_label = video_info.and_then(|info| text_field(info, "source_name"));
    let episodes = value
        .get("episodes")
        .and_then(Value::as_array)
        .map(|items| EpisodeList::from_json_array(items))
        .unwrap_or_default();

    TitleDetails {
        title,
        source_label,
        source: source.clone(),
        episodes,
    }
}
