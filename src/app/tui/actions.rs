use std::sync::{Arc, mpsc};
use std::thread;

use anyhow::Result;
use tracing::debug;

use super::super::availability::probe_source;
use super::super::context::{AppContext, TitleSession};
use super::super::detail::fetch_details;
use super::super::display::ResultCard;
use super::super::player::{self, ProcessLauncher, Step};
use super::super::search::search;
use super::super::sequence::RequestKind;
use super::super::source::{CUSTOM_CODE, SourceSelection, is_named_code};
use super::super::status_line;
use super::{Focus, Prompt, PromptKind, SourceIndicator, TuiState, WorkResult};

pub(super) fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

pub(super) fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

pub(super) fn start_search(ctx: &AppContext, state: &mut TuiState, tx: &mpsc::Sender<WorkResult>) {
    let query = state.query.trim().to_string();
    if query.is_empty() {
        state.status = status_error("Please enter a search term");
        return;
    }
    let source = match state.source.selection() {
        Ok(source) => source,
        Err(err) => {
            state.status = status_error(&format!("{err:#}"));
            return;
        }
    };

    let ticket = state.sequencer.issue(RequestKind::Search);
    // A detail still in flight belongs to the old result list.
    state.sequencer.invalidate(RequestKind::Detail);
    state.loading_search = true;
    state.loading_detail = false;
    state.status = status_info(&format!("Searching {source}..."));

    let transport = Arc::clone(&ctx.transport);
    let limit = ctx.config.timeouts.request;
    let tx = tx.clone();
    thread::spawn(move || {
        let result = search(transport, &query, &source, limit);
        let _ = tx.send(WorkResult::Search { ticket, result });
    });
}

pub(super) fn open_selected_title(
    ctx: &AppContext,
    state: &mut TuiState,
    tx: &mpsc::Sender<WorkResult>,
) {
    let Some(item) = state
        .results_table
        .selected()
        .and_then(|idx| state.results.get(idx))
    else {
        return;
    };

    debug!(action = %ResultCard::from_item(item).action_token(), "opening title");
    let ticket = state.sequencer.issue(RequestKind::Detail);
    state.loading_detail = true;
    state.status = status_info("Loading details...");

    let transport = Arc::clone(&ctx.transport);
    let limit = ctx.config.timeouts.request;
    let id = item.id.clone();
    let source = item.source.clone();
    let hint = item.title.clone();
    let tx = tx.clone();
    thread::spawn(move || {
        let result = fetch_details(transport, &id, &source, Some(&hint), limit);
        let _ = tx.send(WorkResult::Detail { ticket, result });
    });
}

pub(super) fn begin_status_check(
    ctx: &AppContext,
    state: &mut TuiState,
    tx: &mpsc::Sender<WorkResult>,
    force: bool,
) {
    if state.source.is_custom() && state.source.custom_url.is_empty() {
        state.sequencer.invalidate(RequestKind::Probe);
        state.source_indicator = SourceIndicator::AwaitingUrl;
        return;
    }
    let source = match state.source.selection() {
        Ok(source) => source,
        Err(err) => {
            state.status = status_error(&format!("{err:#}"));
            return;
        }
    };

    if !force && let Some(status) = ctx.availability().cached(&source) {
        state.sequencer.invalidate(RequestKind::Probe);
        state.source_indicator = SourceIndicator::Known(status);
        return;
    }
    spawn_probe(ctx, state, tx, source, force || state.source.is_custom());
}

fn spawn_probe(
    ctx: &AppContext,
    state: &mut TuiState,
    tx: &mpsc::Sender<WorkResult>,
    source: SourceSelection,
    announce: bool,
) {
    let ticket = state.sequencer.issue(RequestKind::Probe);
    state.source_indicator = SourceIndicator::Testing;

    let transport = Arc::clone(&ctx.transport);
    let limit = ctx.config.timeouts.probe;
    let tx = tx.clone();
    thread::spawn(move || {
        let outcome = probe_source(transport, &source, limit);
        let _ = tx.send(WorkResult::Probe {
            ticket,
            source,
            outcome,
            announce,
        });
    });
}

pub(super) fn drain_work_results(
    ctx: &AppContext,
    state: &mut TuiState,
    rx: &mpsc::Receiver<WorkResult>,
) {
    while let Ok(work) = rx.try_recv() {
        match work {
            WorkResult::Search { ticket, result } => {
                if !state.sequencer.accept(ticket) {
                    continue;
                }
                state.loading_search = false;
                match result {
                    Ok(items) => {
                        state.status = if items.is_empty() {
                            status_info("No results found.")
                        } else {
                            status_info(&format!("{} result(s). Enter opens a title.", items.len()))
                        };
                        state.results = items;
                        state.results_table.select((!state.results.is_empty()).then_some(0));
                        state.title = None;
                        state.episodes_table.select(None);
                        if !state.results.is_empty() {
                            state.focus = Focus::Results;
                        }
                    }
                    Err(err) => state.status = status_error(&err.notice()),
                }
            }
            WorkResult::Detail { ticket, result } => {
                if !state.sequencer.accept(ticket) {
                    continue;
                }
                state.loading_detail = false;
                match result {
                    Ok(details) => {
                        let playable = details.has_playable_video();
                        let session = TitleSession::new(details);
                        state.status = if playable {
                            status_info(&format!(
                                "{} episode(s). Enter plays, r reverses order.",
                                session.details().episodes.len()
                            ))
                        } else {
                            status_info("No playable video found.")
                        };
                        state.episodes_table.select(playable.then_some(0));
                        state.title = Some(session);
                        if playable {
                            state.focus = Focus::Episodes;
                        }
                    }
                    Err(err) => state.status = status_error(&err.notice()),
                }
            }
            WorkResult::Probe {
                ticket,
                source,
                outcome,
                announce,
            } => {
                // Recorded even when superseded; the probe result is still true.
                let status = ctx.availability().record(&source, outcome);
                if !state.sequencer.accept(ticket) {
                    continue;
                }
                state.source_indicator = SourceIndicator::Known(status);
                if announce {
                    state.status = if source.custom_url().is_some() {
                        if status.available {
                            status_info("Endpoint available")
                        } else {
                            status_error("Endpoint unavailable; check the address")
                        }
                    } else {
                        status_info(&format!("{source}: {}", status_line(&status)))
                    };
                }
            }
        }
    }
}

pub(super) fn apply_prompt(
    ctx: &AppContext,
    state: &mut TuiState,
    prompt: Prompt,
    tx: &mpsc::Sender<WorkResult>,
) -> Result<()> {
    let input = prompt.input.trim().to_string();
    match prompt.kind {
        PromptKind::SourceCode => {
            if input.is_empty() {
                state.status = status_error("Source code cannot be empty.");
                return Ok(());
            }
            if input != CUSTOM_CODE && !is_named_code(&input) {
                state.status = status_error(&format!("Invalid source code {input:?}."));
                return Ok(());
            }
            state.source.code = input;
            state.source.save(&ctx.store)?;
            debug!(source = %state.source.code, "source changed from tui");
            state.sequencer.invalidate(RequestKind::Search);
            state.sequencer.invalidate(RequestKind::Detail);
            state.loading_search = false;
            state.loading_detail = false;
            state.reset_search_area();

            if state.source.code == CUSTOM_CODE {
                state.prompt = Some(Prompt {
                    kind: PromptKind::CustomUrl,
                    input: state.source.custom_url.clone(),
                });
                state.status = status_info("Enter the custom endpoint URL.");
                begin_status_check(ctx, state, tx, false);
                return Ok(());
            }
            state.status = status_info(&format!("Switched to {}.", state.source.code));
            begin_status_check(ctx, state, tx, false);
        }
        PromptKind::CustomUrl => {
            if input.is_empty() {
                state.status = status_error("Custom endpoint cannot be empty.");
                return Ok(());
            }
            state.source.custom_url = input;
            state.source.save(&ctx.store)?;
            state.status = status_info("Testing custom endpoint...");
            begin_status_check(ctx, state, tx, true);
        }
    }
    Ok(())
}

pub(super) fn play_selected_episode(ctx: &AppContext, state: &mut TuiState) -> Result<String> {
    let Some(title) = state.title.as_ref() else {
        return Ok("Open a title first.".to_string());
    };
    let Some(playback) = state
        .episodes_table
        .selected()
        .and_then(|pos| title.playback_at_display(pos))
    else {
        return Ok("No playable video found.".to_string());
    };
    let launcher = ProcessLauncher::new(ctx.config.player_bin.clone());
    let outcome = player::start_playback(&ctx.store, &playback, &launcher)?;
    Ok(outcome.message())
}

pub(super) fn step_playback(ctx: &AppContext, direction: Step) -> Result<String> {
    let launcher = ProcessLauncher::new(ctx.config.player_bin.clone());
    let outcome = player::step(&ctx.store, direction, &launcher)?;
    Ok(outcome.message())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, mpsc};

    use crate::config::{Config, Timeouts};
    use crate::http::{Transport, TransportError};
    use crate::store::Store;

    use super::super::super::availability::ProbeOutcome;
    use super::super::super::context::AppContext;
    use super::super::super::detail::TitleDetails;
    use super::super::super::episode::EpisodeList;
    use super::super::super::error::SessionError;
    use super::super::super::search::SearchResultItem;
    use super::super::super::sequence::RequestKind;
    use super::super::super::source::{SavedSource, SourceSelection};
    use super::super::{SourceIndicator, TuiState, WorkResult};
    use super::{drain_work_results, start_search};

    struct EmptyList;

    impl Transport for EmptyList {
        fn get_text(&self, _: &str, _: &[(String, String)]) -> Result<String, TransportError> {
            Ok(r#"{"code":200,"list":[]}"#.to_string())
        }
    }

    fn context() -> AppContext {
        let store = Store::open_in_memory().expect("store");
        let config = Config {
            api_base: "http://unused.invalid".to_string(),
            player_bin: PathBuf::from("mpv"),
            db_path: PathBuf::from(":memory:"),
            timeouts: Timeouts::default(),
        };
        AppContext::new(store, Arc::new(EmptyList), config)
    }

    fn state() -> TuiState {
        TuiState::new(SavedSource {
            code: "heimuer".to_string(),
            custom_url: String::new(),
        })
    }

    fn named() -> SourceSelection {
        SourceSelection::Named("heimuer".to_string())
    }

    fn item(id: &str) -> SearchResultItem {
        SearchResultItem {
            id: id.to_string(),
            title: format!("Title {id}"),
            source_label: "Heimuer".to_string(),
            source: named(),
            cover_url: None,
            category: None,
            year: None,
            remarks: None,
        }
    }

    fn details() -> TitleDetails {
        TitleDetails {
            title: "Show".to_string(),
            source_label: None,
            source: named(),
            episodes: EpisodeList::from_raw(["https://a/1", "https://a/2"]),
        }
    }

    #[test]
    fn latest_search_clears_loading_on_success_and_failure() {
        let ctx = context();
        let mut state = state();
        let (tx, rx) = mpsc::channel();

        let ticket = state.sequencer.issue(RequestKind::Search);
        state.loading_search = true;
        tx.send(WorkResult::Search {
            ticket,
            result: Ok(vec![item("1")]),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(!state.loading_search);
        assert_eq!(state.results.len(), 1);

        let ticket = state.sequencer.issue(RequestKind::Search);
        state.loading_search = true;
        tx.send(WorkResult::Search {
            ticket,
            result: Err(SessionError::Timeout),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(!state.loading_search);
        assert!(state.status.starts_with("ERROR: Request timed out"));
        assert_eq!(state.results.len(), 1);
    }

    #[test]
    fn latest_detail_clears_loading_on_success_and_failure() {
        let ctx = context();
        let mut state = state();
        let (tx, rx) = mpsc::channel();

        let ticket = state.sequencer.issue(RequestKind::Detail);
        state.loading_detail = true;
        tx.send(WorkResult::Detail {
            ticket,
            result: Ok(details()),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(!state.loading_detail);
        assert!(state.title.is_some());
        assert_eq!(state.episodes_table.selected(), Some(0));

        let ticket = state.sequencer.issue(RequestKind::Detail);
        state.loading_detail = true;
        tx.send(WorkResult::Detail {
            ticket,
            result: Err(SessionError::RequestFailed("boom".to_string())),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(!state.loading_detail);
        assert!(state.status.starts_with("ERROR: Request failed"));
    }

    #[test]
    fn superseded_results_leave_loading_and_results_alone() {
        let ctx = context();
        let mut state = state();
        let (tx, rx) = mpsc::channel();

        let stale_search = state.sequencer.issue(RequestKind::Search);
        let _pending_search = state.sequencer.issue(RequestKind::Search);
        let stale_detail = state.sequencer.issue(RequestKind::Detail);
        let _pending_detail = state.sequencer.issue(RequestKind::Detail);
        state.loading_search = true;
        state.loading_detail = true;
        let before = state.status.clone();

        tx.send(WorkResult::Search {
            ticket: stale_search,
            result: Ok(vec![item("old")]),
        })
        .expect("send");
        tx.send(WorkResult::Detail {
            ticket: stale_detail,
            result: Err(SessionError::Timeout),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);

        assert!(state.loading_search);
        assert!(state.loading_detail);
        assert!(state.results.is_empty());
        assert!(state.title.is_none());
        assert_eq!(state.status, before);
    }

    #[test]
    fn superseded_status_check_is_cached_but_not_shown() {
        let ctx = context();
        let mut state = state();
        let (tx, rx) = mpsc::channel();

        let stale = state.sequencer.issue(RequestKind::Probe);
        let latest = state.sequencer.issue(RequestKind::Probe);
        state.source_indicator = SourceIndicator::Testing;

        tx.send(WorkResult::Probe {
            ticket: stale,
            source: named(),
            outcome: ProbeOutcome::Reachable,
            announce: true,
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert_eq!(state.source_indicator, SourceIndicator::Testing);
        let cached = ctx.availability().cached(&named()).expect("cached");
        assert!(cached.available);

        tx.send(WorkResult::Probe {
            ticket: latest,
            source: named(),
            outcome: ProbeOutcome::Unreachable,
            announce: false,
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(matches!(
            state.source_indicator,
            SourceIndicator::Known(status) if !status.available
        ));
    }

    #[test]
    fn new_search_drops_the_pending_detail() {
        let ctx = context();
        let mut state = state();
        let (tx, rx) = mpsc::channel();
        // Workers spawned by start_search report into a channel nobody reads.
        let (worker_tx, _) = mpsc::channel();

        let detail = state.sequencer.issue(RequestKind::Detail);
        state.loading_detail = true;
        state.query = "naruto".to_string();
        start_search(&ctx, &mut state, &worker_tx);
        assert!(state.loading_search);
        assert!(!state.loading_detail);

        tx.send(WorkResult::Detail {
            ticket: detail,
            result: Ok(details()),
        })
        .expect("send");
        drain_work_results(&ctx, &mut state, &rx);
        assert!(state.title.is_none());
        assert!(!state.loading_detail);
    }
}
