use std::fmt;

use anyhow::{Result, bail};

use crate::store::Store;

pub(crate) const DEFAULT_SOURCE: &str = "heimuer";
pub(crate) const CUSTOM_CODE: &str = "custom";

const CURRENT_SOURCE_KEY: &str = "source.current";
const CUSTOM_URL_KEY: &str = "source.custom_url";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum SourceSelection {
    Named(String),
    Custom(String),
}

impl SourceSelection {
    pub(crate) fn from_code(code: &str, custom_url: Option<&str>) -> Result<Self> {
        let code = code.trim();
        if code == CUSTOM_CODE {
            match custom_url.map(str::trim) {
                Some(url) if !url.is_empty() => Ok(Self::Custom(url.to_string())),
                _ => bail!("the custom source needs an endpoint URL"),
            }
        } else if code.is_empty() {
            bail!("empty source code")
        } else if !is_named_code(code) {
            bail!("invalid source code {code:?}")
        } else {
            Ok(Self::Named(code.to_string()))
        }
    }

    pub(crate) fn code(&self) -> &str {
        match self {
            Self::Named(code) => code,
            Self::Custom(_) => CUSTOM_CODE,
        }
    }

    pub(crate) fn custom_url(&self) -> Option<&str> {
        match self {
            Self::Named(_) => None,
            Self::Custom(url) => Some(url),
        }
    }

    pub(crate) fn query_params(&self) -> (String, String) {
        match self {
            Self::Named(code) => ("source".to_string(), code.clone()),
            Self::Custom(url) => ("customApi".to_string(), url.clone()),
        }
    }
}

// `:` separates the parts of availability cache keys, so named codes may not
// contain it.
pub(crate) fn is_named_code(code: &str) -> bool {
    !code.is_empty() && !code.contains(':') && !code.chars().any(char::is_whitespace)
}

impl fmt::Display for SourceSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(code) => f.write_str(code),
            Self::Custom(url) => write!(f, "custom ({url})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SavedSource {
    pub(crate) code: String,
    pub(crate) custom_url: String,
}

impl SavedSource {
    pub(crate) fn load(store: &Store) -> Self {
        let code = store
            .get(CURRENT_SOURCE_KEY)
            .ok()
            .flatten()
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        let custom_url = store.get(CUSTOM_URL_KEY).ok().flatten().unwrap_or_default();
        Self { code, custom_url }
    }

    pub(crate) fn save(&self, store: &Store) -> Result<()> {
        store.set(CURRENT_SOURCE_KEY, &self.code)?;
        if self.custom_url.is_empty() {
            store.remove(CUSTOM_URL_KEY)?;
        } else {
            store.set(CUSTOM_URL_KEY, &self.custom_url)?;
        }
        Ok(())
    }

    pub(crate) fn is_custom(&self) -> bool {
        self.code == CUSTOM_CODE
    }

    pub(crate) fn selection(&self) -> Result<SourceSelection> {
        SourceSelection::from_code(&self.code, Some(&self.custom_url))
    }
}
