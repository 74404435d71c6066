use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::store::Store;

use super::super::episode::{EpisodeList, EpisodeOrder};

const TITLE_KEY: &str = "playback.title";
const INDEX_KEY: &str = "playback.index";
const EPISODES_KEY: &str = "playback.episodes";
const REVERSED_KEY: &str = "playback.reversed";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlaybackState {
    title: String,
    episodes: EpisodeList,
    current_index: usize,
    order: EpisodeOrder,
}

impl PlaybackState {
    pub(crate) fn new(
        title: &str,
        episodes: EpisodeList,
        current_index: usize,
        order: EpisodeOrder,
    ) -> Option<Self> {
        (current_index < episodes.len()).then(|| Self {
            title: title.to_string(),
            episodes,
            current_index,
            order,
        })
    }

    pub(crate) fn title(&self) -> &str {
        &self.title
    }

    pub(crate) fn episodes(&self) -> &EpisodeList {
        &self.episodes
    }

    pub(crate) fn current_index(&self) -> usize {
        self.current_index
    }

    pub(crate) fn order(&self) -> EpisodeOrder {
        self.order
    }

    pub(crate) fn current_url(&self) -> &str {
        self.episodes.get(self.current_index).unwrap_or_default()
    }

    pub(crate) fn next_episode(&self) -> Option<Self> {
        let index = next_index(self.current_index, self.episodes.len())?;
        Some(self.at(index))
    }

    pub(crate) fn previous_episode(&self) -> Option<Self> {
        let index = previous_index(self.current_index)?;
        Some(self.at(index))
    }

    fn at(&self, current_index: usize) -> Self {
        Self {
            current_index,
            ..self.clone()
        }
    }
}

fn next_index(current: usize, len: usize) -> Option<usize> {
    (current + 1 < len).then_some(current + 1)
}

fn previous_index(current: usize) -> Option<usize> {
    current.checked_sub(1)
}

pub(crate) fn handoff(store: &Store, state: &PlaybackState) -> Result<()> {
    let episodes = serde_json::to_string(state.episodes().as_slice())
        .context("failed to encode episode list")?;
    store.set(TITLE_KEY, state.title())?;
    store.set(INDEX_KEY, &state.current_index().to_string())?;
    store.set(EPISODES_KEY, &episodes)?;
    store.set(
        REVERSED_KEY,
        if state.order().is_reversed() { "true" } else { "false" },
    )?;
    info!(
        title = state.title(),
        index = state.current_index(),
        episodes = state.episodes().len(),
        "playback state handed off"
    );
    Ok(())
}

// Reads the shared playback entries back. Anything missing, unreadable or
// inconsistent means there is no handoff to resume.
pub(crate) fn load_handoff(store: &Store) -> Option<PlaybackState> {
    let read = |key: &str| store.get(key).ok().flatten();

    let title = read(TITLE_KEY)?;
    let current_index = read(INDEX_KEY)?.trim().parse::<usize>().ok()?;
    let raw_episodes = serde_json::from_str::<Vec<String>>(&read(EPISODES_KEY)?).ok()?;
    let reversed = read(REVERSED_KEY)
        .and_then(|raw| raw.trim().parse::<bool>().ok())
        .unwrap_or(false);

    let episodes = EpisodeList::from_raw(&raw_episodes);
    if episodes.len() != raw_episodes.len() {
        debug!("stored episode list contains unplayable entries; ignoring handoff");
        return None;
    }
    PlaybackState::new(&title, episodes, current_index, EpisodeOrder::new(reversed))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(n: usize, index: usize) -> PlaybackState {
        let episodes =
            EpisodeList::from_raw((0..n).map(|i| format!("https://cdn.test/ep{i}.m3u8")));
        PlaybackState::new("Show", episodes, index, EpisodeOrder::default()).expect("valid state")
    }

    #[test]
    fn construction_rejects_out_of_range_index() {
        assert!(PlaybackState::new("x", EpisodeList::default(), 0, EpisodeOrder::default()).is_none());
        let episodes = EpisodeList::from_raw(["https://a/1"]);
        assert!(PlaybackState::new("x", episodes, 1, EpisodeOrder::default()).is_none());
    }

    #[test]
    fn previous_at_first_and_next_at_last_are_no_ops() {
        assert_eq!(state(3, 0).previous_episode(), None);
        assert_eq!(state(3, 2).next_episode(), None);
        assert_eq!(state(1, 0).next_episode(), None);
    }

    #[test]
    fn stepping_moves_one_episode_without_wrapping() {
        let next = state(3, 0).next_episode().expect("next");
        assert_eq!(next.current_index(), 1);
        assert_eq!(next.current_url(), "https://cdn.test/ep1.m3u8");
        let previous = next.previous_episode().expect("previous");
        assert_eq!(previous.current_index(), 0);
    }

    #[test]
    fn handoff_round_trips_through_store() {
        let store = Store::open_in_memory().expect("store");
        let mut original = state(4, 2);
        original.order = EpisodeOrder::new(true);
        handoff(&store, &original).expect("handoff");
        assert_eq!(load_handoff(&store), Some(original));
    }

    #[test]
    fn corrupt_entries_read_as_no_handoff() {
        let store = Store::open_in_memory().expect("store");
        handoff(&store, &state(2, 1)).expect("handoff");

        store.set(INDEX_KEY, "five").expect("write");
        assert_eq!(load_handoff(&store), None);

        store.set(INDEX_KEY, "7").expect("write");
        assert_eq!(load_handoff(&store), None);

        store.set(INDEX_KEY, "0").expect("write");
        store.set(EPISODES_KEY, "[not json").expect("write");
        assert_eq!(load_handoff(&store), None);

        store.set(EPISODES_KEY, r#"["https://a/1","ftp://b"]"#).expect("write");
        assert_eq!(load_handoff(&store), None);
    }
}
