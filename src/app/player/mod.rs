mod handoff;
mod process;

use std::path::PathBuf;
use std::process::{Command as ProcessCommand, Stdio};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::store::Store;

use super::display::escape_markup;

pub(crate) use handoff::{PlaybackState, handoff, load_handoff};
pub(crate) use process::PlayerExit;

use self::process::run_player;

pub(crate) const LOAD_FAILED_NOTICE: &str = "Video failed to load; try another source";

pub(crate) trait PlayerLauncher {
    fn launch(&self, title: &str, url: &str) -> Result<PlayerExit>;
}

pub(crate) struct ProcessLauncher {
    bin: PathBuf,
}

impl ProcessLauncher {
    pub(crate) fn new(bin: PathBuf) -> Self {
        Self { bin }
    }
}

impl PlayerLauncher for ProcessLauncher {
    fn launch(&self, title: &str, url: &str) -> Result<PlayerExit> {
        let mut cmd = ProcessCommand::new(&self.bin);
        if is_mpv(&self.bin) {
            cmd.arg(format!("--force-media-title={title}"));
        }
        cmd.arg(url)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let exit =
            run_player(cmd).with_context(|| format!("failed to launch {}", self.bin.display()))?;
        info!(?exit, "player exited");
        Ok(exit)
    }
}

fn is_mpv(bin: &std::path::Path) -> bool {
    bin.file_stem().is_some_and(|stem| stem == "mpv")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    Next,
    Previous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PlayerOutcome {
    Played { title: String, index: usize },
    Stopped { title: String, index: usize },
    LoadFailed(String),
    NothingToResume,
    AtEdge(Step),
}

impl PlayerOutcome {
    pub(crate) fn message(&self) -> String {
        match self {
            Self::Played { title, index } => {
                format!("Played {} | episode {}", escape_markup(title), index + 1)
            }
            Self::Stopped { title, index } => {
                format!("Stopped {} | episode {}", escape_markup(title), index + 1)
            }
            Self::LoadFailed(notice) => notice.clone(),
            Self::NothingToResume => {
                "Nothing to resume yet. Pick an episode with `vidseek play` first.".to_string()
            }
            Self::AtEdge(Step::Next) => "Already at the last episode.".to_string(),
            Self::AtEdge(Step::Previous) => "Already at the first episode.".to_string(),
        }
    }
}

pub(crate) fn start_playback(
    store: &Store,
    state: &PlaybackState,
    launcher: &dyn PlayerLauncher,
) -> Result<PlayerOutcome> {
    handoff(store, state)?;
    play_handed_off(state, launcher)
}

pub(crate) fn resume(store: &Store, launcher: &dyn PlayerLauncher) -> Result<PlayerOutcome> {
    match load_handoff(store) {
        Some(state) => play_handed_off(&state, launcher),
        None => Ok(PlayerOutcome::NothingToResume),
    }
}

// Previous/next trigger of the player surface. At either end nothing is
// written and nothing is launched.
pub(crate) fn step(
    store: &Store,
    direction: Step,
    launcher: &dyn PlayerLauncher,
) -> Result<PlayerOutcome> {
    let Some(state) = load_handoff(store) else {
        return Ok(PlayerOutcome::NothingToResume);
    };
    let moved = match direction {
        Step::Next => state.next_episode(),
        Step::Previous => state.previous_episode(),
    };
    match moved {
        Some(moved) => start_playback(store, &moved, launcher),
        None => Ok(PlayerOutcome::AtEdge(direction)),
    }
}

fn play_handed_off(state: &PlaybackState, launcher: &dyn PlayerLauncher) -> Result<PlayerOutcome> {
    let title = state.title().to_string();
    let index = state.current_index();
    Ok(match launcher.launch(state.title(), state.current_url())? {
        PlayerExit::Finished => PlayerOutcome::Played { title, index },
        // The handoff stays written, so `resume` picks the episode up again.
        PlayerExit::Interrupted => PlayerOutcome::Stopped { title, index },
        PlayerExit::Failed(code) => handle_player_error(state, code),
    })
}

fn handle_player_error(state: &PlaybackState, code: Option<i32>) -> PlayerOutcome {
    warn!(
        title = state.title(),
        index = state.current_index(),
        ?code,
        "player could not load episode"
    );
    PlayerOutcome::LoadFailed(LOAD_FAILED_NOTICE.to_string())
}
