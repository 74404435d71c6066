mod actions;
mod render;
mod session;

use std::sync::mpsc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::widgets::TableState;

use super::availability::{ProbeOutcome, SourceStatus};
use super::context::{AppContext, TitleSession};
use super::detail::TitleDetails;
use super::error::SessionError;
use super::player::Step;
use super::search::SearchResultItem;
use super::sequence::{RequestSequencer, Ticket};
use super::source::{SavedSource, SourceSelection};

use self::actions::{
    apply_prompt, begin_status_check, drain_work_results, open_selected_title, play_selected_episode,
    start_search, status_error, status_info, step_playback,
};
use self::session::Screen;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Focus {
    Query,
    Results,
    Episodes,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Self::Query => Self::Results,
            Self::Results => Self::Episodes,
            Self::Episodes => Self::Query,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PromptKind {
    SourceCode,
    CustomUrl,
}

#[derive(Debug, Clone)]
pub(super) struct Prompt {
    pub(super) kind: PromptKind,
    pub(super) input: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SourceIndicator {
    Testing,
    AwaitingUrl,
    Known(SourceStatus),
}

#[derive(Debug)]
pub(super) enum WorkResult {
    Search {
        ticket: Ticket,
        result: Result<Vec<SearchResultItem>, SessionError>,
    },
    Detail {
        ticket: Ticket,
        result: Result<TitleDetails, SessionError>,
    },
    Probe {
        ticket: Ticket,
        source: SourceSelection,
        outcome: ProbeOutcome,
        announce: bool,
    },
}

pub(super) struct TuiState {
    pub(super) focus: Focus,
    pub(super) query: String,
    pub(super) results: Vec<SearchResultItem>,
    pub(super) results_table: TableState,
    pub(super) title: Option<TitleSession>,
    pub(super) episodes_table: TableState,
    pub(super) source: SavedSource,
    pub(super) source_indicator: SourceIndicator,
    pub(super) prompt: Option<Prompt>,
    pub(super) status: String,
    pub(super) loading_search: bool,
    pub(super) loading_detail: bool,
    pub(super) sequencer: RequestSequencer,
}

impl TuiState {
    pub(super) fn new(source: SavedSource) -> Self {
        Self {
            focus: Focus::Query,
            query: String::new(),
            results: Vec::new(),
            results_table: TableState::default(),
            title: None,
            episodes_table: TableState::default(),
            source,
            source_indicator: SourceIndicator::Testing,
            prompt: None,
            status: status_info("Type a title and press Enter to search."),
            loading_search: false,
            loading_detail: false,
            sequencer: RequestSequencer::default(),
        }
    }

    pub(super) fn is_loading(&self) -> bool {
        self.loading_search || self.loading_detail
    }

    pub(super) fn reset_search_area(&mut self) {
        self.query.clear();
        self.results.clear();
        self.results_table.select(None);
        self.title = None;
        self.episodes_table.select(None);
        self.focus = Focus::Query;
    }
}

pub(crate) fn run_tui(ctx: &AppContext) -> Result<()> {
    let mut screen = Screen::open()?;

    let mut state = TuiState::new(ctx.saved_source());
    let (work_tx, work_rx) = mpsc::channel::<WorkResult>();
    begin_status_check(ctx, &mut state, &work_tx, false);

    loop {
        drain_work_results(ctx, &mut state, &work_rx);
        screen.draw(&mut state)?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if state.prompt.is_some() {
            handle_prompt_key(ctx, &mut state, key, &work_tx)?;
            continue;
        }

        if state.focus == Focus::Query {
            match key.code {
                KeyCode::Enter => start_search(ctx, &mut state, &work_tx),
                KeyCode::Backspace => {
                    state.query.pop();
                }
                KeyCode::Tab | KeyCode::Down => state.focus = Focus::Results,
                KeyCode::Esc => break,
                KeyCode::Char(ch) => state.query.push(ch),
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => break,
            KeyCode::Char('/') => state.focus = Focus::Query,
            KeyCode::Tab => state.focus = state.focus.next(),
            KeyCode::Char('s') => {
                state.prompt = Some(Prompt {
                    kind: PromptKind::SourceCode,
                    input: state.source.code.clone(),
                });
            }
            KeyCode::Char('t') => begin_status_check(ctx, &mut state, &work_tx, true),
            KeyCode::Char('r') if state.focus == Focus::Episodes => {
                if let Some(title) = state.title.as_mut() {
                    title.toggle_order();
                    state.episodes_table.select((!title.slots().is_empty()).then_some(0));
                }
            }
            KeyCode::Up => move_selection(&mut state, -1),
            KeyCode::Down => move_selection(&mut state, 1),
            KeyCode::Enter if state.focus == Focus::Results => {
                open_selected_title(ctx, &mut state, &work_tx)
            }
            KeyCode::Enter | KeyCode::Char('n') | KeyCode::Char('p')
                if state.focus == Focus::Episodes =>
            {
                let result = screen.hand_to_player(|| match key.code {
                    KeyCode::Char('n') => step_playback(ctx, Step::Next),
                    KeyCode::Char('p') => step_playback(ctx, Step::Previous),
                    _ => play_selected_episode(ctx, &mut state),
                })?;
                state.status = match result {
                    Ok(msg) => status_info(&msg),
                    Err(err) => status_error(&format!("Playback failed: {err:#}")),
                };
            }
            _ => {}
        }
    }

    screen.close()
}

fn handle_prompt_key(
    ctx: &AppContext,
    state: &mut TuiState,
    key: KeyEvent,
    tx: &mpsc::Sender<WorkResult>,
) -> Result<()> {
    let Some(prompt) = state.prompt.as_mut() else {
        return Ok(());
    };
    match key.code {
        KeyCode::Esc => {
            let kind = prompt.kind;
            state.prompt = None;
            state.status = status_info(match kind {
                PromptKind::SourceCode => "Source unchanged.",
                PromptKind::CustomUrl => "Custom endpoint unchanged.",
            });
        }
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Char(ch) => prompt.input.push(ch),
        KeyCode::Enter => {
            let submitted = state.prompt.take();
            if let Some(prompt) = submitted {
                apply_prompt(ctx, state, prompt, tx)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn move_selection(state: &mut TuiState, delta: isize) {
    let (table, len) = match state.focus {
        Focus::Results => (&mut state.results_table, state.results.len()),
        Focus::Episodes => (
            &mut state.episodes_table,
            state
                .title
                .as_ref()
                .map(|title| title.details().episodes.len())
                .unwrap_or(0),
        ),
        Focus::Query => return,
    };
    if len == 0 {
        table.select(None);
        return;
    }
    let current = table.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1) as usize;
    table.select(Some(next));
}
