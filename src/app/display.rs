use super::search::SearchResultItem;

pub(crate) const NO_DESCRIPTION: &str = "No description";

// Neutralises markup in untrusted upstream text and strips control
// characters so nothing can reach the terminal as an escape sequence.
pub(crate) fn escape_markup(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' | '\t' => out.push(' '),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}

pub(crate) fn safe_identifier(raw: &str) -> String {
    raw.chars()
        .filter(|ch| ch.is_ascii_alphanumeric() || *ch == '_' || *ch == '-')
        .collect()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut out = s.to_string();
    if out.chars().count() > max {
        out = out.chars().take(max.saturating_sub(3)).collect::<String>() + "...";
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResultCard {
    pub(crate) id: String,
    pub(crate) title: String,
    pub(crate) source_label: Option<String>,
    pub(crate) source_code: String,
    pub(crate) cover_url: Option<String>,
    pub(crate) category: Option<String>,
    pub(crate) year: Option<String>,
    pub(crate) remarks: String,
}

impl ResultCard {
    pub(crate) fn from_item(item: &SearchResultItem) -> Self {
        let clean = |value: &Option<String>| {
            value
                .as_deref()
                .map(escape_markup)
                .filter(|text| !text.trim().is_empty())
        };
        Self {
            id: safe_identifier(&item.id),
            title: escape_markup(&item.title),
            source_label: Some(escape_markup(&item.source_label))
                .filter(|text| !text.trim().is_empty()),
            source_code: safe_identifier(item.source.code()),
            cover_url: item.cover_url.as_deref().map(escape_markup),
            category: clean(&item.category),
            year: clean(&item.year),
            remarks: clean(&item.remarks).unwrap_or_else(|| NO_DESCRIPTION.to_string()),
        }
    }

    pub(crate) fn detail_command(&self) -> String {
        format!("vidseek detail {} --source {}", self.id, self.source_code)
    }

    pub(crate) fn action_token(&self) -> String {
        format!("details:{}:{}", self.id, self.source_code)
    }

    pub(crate) fn tags(&self) -> String {
        [self.category.as_deref(), self.year.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" | ")
    }

    pub(crate) fn listing(&self, position: usize) -> Vec<String> {
        let label = self
            .source_label
            .as_deref()
            .map(|label| format!("  [{label}]"))
            .unwrap_or_default();
        let mut lines = vec![format!("{position:>3}. {}{label}", truncate(&self.title, 60))];
        let tags = self.tags();
        if !tags.is_empty() {
            lines.push(format!("     {tags}"));
        }
        lines.push(format!("     {}", truncate(&self.remarks, 72)));
        if let Some(cover) = self.cover_url.as_deref() {
            lines.push(format!("     cover: {cover}"));
        }
        lines.push(format!("     -> {}", self.detail_command()));
        lines
    }
}
