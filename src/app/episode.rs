use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct EpisodeList(Vec<String>);

impl EpisodeList {
    pub(crate) fn from_raw<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            raw.into_iter()
                .filter(|entry| is_playable_url(entry.as_ref()))
                .map(|entry| entry.as_ref().to_string())
                .collect(),
        )
    }

    pub(crate) fn from_json_array(items: &[Value]) -> Self {
        Self::from_raw(items.iter().filter_map(Value::as_str))
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub(crate) fn as_slice(&self) -> &[String] {
        &self.0
    }
}

pub(crate) fn is_playable_url(url: &str) -> bool {
    if url.chars().any(char::is_control) {
        return false;
    }
    let lower = url.to_ascii_lowercase();
    ["http://", "https://"]
        .iter()
        .any(|scheme| lower.starts_with(scheme) && lower.len() > scheme.len())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EpisodeSlot<'a> {
    pub(crate) display_position: usize,
    pub(crate) original_index: usize,
    pub(crate) url: &'a str,
}

impl EpisodeSlot<'_> {
    pub(crate) fn label(&self) -> String {
        episode_label(self.original_index)
    }
}

pub(crate) fn episode_label(original_index: usize) -> String {
    format!("Episode {}", original_index + 1)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct EpisodeOrder {
    reversed: bool,
}

impl EpisodeOrder {
    pub(crate) fn new(reversed: bool) -> Self {
        Self { reversed }
    }

    pub(crate) fn is_reversed(self) -> bool {
        self.reversed
    }

    pub(crate) fn toggle(&mut self) {
        self.reversed = !self.reversed;
    }

    pub(crate) fn toggle_caption(self) -> &'static str {
        if self.reversed {
            "Forward order"
        } else {
            "Reverse order"
        }
    }

    pub(crate) fn display_order(self, episodes: &EpisodeList) -> Vec<EpisodeSlot<'_>> {
        let len = episodes.len();
        (0..len)
            .map(|display_position| {
                let original_index = if self.reversed {
                    len - 1 - display_position
                } else {
                    display_position
                };
                EpisodeSlot {
                    display_position,
                    original_index,
                    url: &episodes.as_slice()[original_index],
                }
            })
            .collect()
    }

    pub(crate) fn original_index_at(self, episodes: &EpisodeList, display_position: usize) -> Option<usize> {
        let len = episodes.len();
        if display_position >= len {
            return None;
        }
        Some(if self.reversed {
            len - 1 - display_position
        } else {
            display_position
        })
    }
}
