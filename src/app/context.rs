use std::sync::Arc;

use anyhow::{Result, bail};
use tracing::info;

use crate::config::Config;
use crate::http::{HttpTransport, Transport};
use crate::store::Store;

use super::availability::{AvailabilityChecker, SourceStatus};
use super::detail::{TitleDetails, fetch_details};
use super::episode::{EpisodeOrder, EpisodeSlot};
use super::error::SessionError;
use super::player::PlaybackState;
use super::search::{SearchResultItem, search};
use super::source::{CUSTOM_CODE, SavedSource, SourceSelection, is_named_code};

pub(crate) struct AppContext {
    pub(crate) store: Store,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) config: Config,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SourceCheck {
    Checked(SourceStatus),
    AwaitingUrl,
}

impl AppContext {
    pub(crate) fn open(config: Config) -> Result<Self> {
        let store = Store::open(&config.db_path)?;
        store.migrate()?;
        let transport: Arc<dyn Transport> =
            Arc::new(HttpTransport::new(&config.api_base, config.timeouts.request));
        Ok(Self::new(store, transport, config))
    }

    pub(crate) fn new(store: Store, transport: Arc<dyn Transport>, config: Config) -> Self {
        Self {
            store,
            transport,
            config,
        }
    }

    pub(crate) fn saved_source(&self) -> SavedSource {
        SavedSource::load(&self.store)
    }

    pub(crate) fn resolve_source(&self, code: Option<&str>) -> Result<SourceSelection> {
        let saved = self.saved_source();
        match code {
            Some(code) => SourceSelection::from_code(code, Some(&saved.custom_url)),
            None => saved.selection(),
        }
    }

    pub(crate) fn availability(&self) -> AvailabilityChecker<'_> {
        AvailabilityChecker::new(
            &self.store,
            Arc::clone(&self.transport),
            self.config.timeouts.probe,
        )
    }

    pub(crate) fn search(
        &self,
        query: &str,
        source: &SourceSelection,
    ) -> Result<Vec<SearchResultItem>, SessionError> {
        search(
            Arc::clone(&self.transport),
            query,
            source,
            self.config.timeouts.request,
        )
    }

    pub(crate) fn open_title(
        &self,
        id: &str,
        source: &SourceSelection,
        title_hint: Option<&str>,
    ) -> Result<TitleSession, SessionError> {
        let details = fetch_details(
            Arc::clone(&self.transport),
            id,
            source,
            title_hint,
            self.config.timeouts.request,
        )?;
        Ok(TitleSession::new(details))
    }

    pub(crate) fn change_source(
        &self,
        code: &str,
        custom_url: Option<&str>,
    ) -> Result<SourceCheck> {
        let code = code.trim();
        if code != CUSTOM_CODE && !is_named_code(code) {
            bail!("invalid source code {code:?}");
        }
        let mut saved = self.saved_source();
        saved.code = code.to_string();
        if let Some(url) = custom_url {
            saved.custom_url = url.trim().to_string();
        }
        saved.save(&self.store)?;
        info!(source = %saved.code, "source selection saved");

        if saved.code == CUSTOM_CODE {
            if saved.custom_url.is_empty() {
                return Ok(SourceCheck::AwaitingUrl);
            }
            let selection = saved.selection()?;
            return Ok(SourceCheck::Checked(
                self.availability().status_refreshed(&selection),
            ));
        }
        let selection = saved.selection()?;
        Ok(SourceCheck::Checked(self.availability().status(&selection)))
    }
}

// One opened title. Built fresh for every detail fetch, so the episode
// order always starts forward.
#[derive(Debug, Clone)]
pub(crate) struct TitleSession {
    details: TitleDetails,
    order: EpisodeOrder,
}

impl TitleSession {
    pub(crate) fn new(details: TitleDetails) -> Self {
        Self {
            details,
            order: EpisodeOrder::default(),
        }
    }

    pub(crate) fn details(&self) -> &TitleDetails {
        &self.details
    }

    pub(crate) fn order(&self) -> EpisodeOrder {
        self.order
    }

    pub(crate) fn toggle_order(&mut self) {
        self.order.toggle();
    }

    pub(crate) fn slots(&self) -> Vec<EpisodeSlot<'_>> {
        self.order.display_order(&self.details.episodes)
    }

    pub(crate) fn playback_at(&self, original_index: usize) -> Option<PlaybackState> {
        PlaybackState::new(
            &self.details.title,
            self.details.episodes.clone(),
            original_index,
            self.order,
        )
    }

    pub(crate) fn playback_at_display(&self, display_position: usize) -> Option<PlaybackState> {
        let index = self
            .order
            .original_index_at(&self.details.episodes, display_position)?;
        self.playback_at(index)
    }
}
