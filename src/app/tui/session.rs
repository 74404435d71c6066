use std::io::{self, Stdout};

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use super::TuiState;
use super::render::draw_tui;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenMode {
    Dashboard,
    Released,
}

// The dashboard's hold on the terminal. The player borrows the plain screen
// through `hand_to_player`; dropping the screen always gives the terminal back.
pub(super) struct Screen {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    mode: ScreenMode,
}

impl Screen {
    pub(super) fn open() -> Result<Self> {
        claim()?;
        let mut screen = Self {
            terminal: Terminal::new(CrosstermBackend::new(io::stdout()))
                .context("failed to initialize terminal backend")?,
            mode: ScreenMode::Dashboard,
        };
        screen.terminal.clear()?;
        Ok(screen)
    }

    pub(super) fn draw(&mut self, state: &mut TuiState) -> Result<()> {
        self.terminal.draw(|frame| draw_tui(frame, state))?;
        Ok(())
    }

    pub(super) fn hand_to_player<T>(&mut self, play: impl FnOnce() -> T) -> Result<T> {
        self.release()?;
        let played = play();
        claim()?;
        self.mode = ScreenMode::Dashboard;
        // The player drew over the alternate screen's previous contents.
        self.terminal.clear()?;
        Ok(played)
    }

    pub(super) fn close(mut self) -> Result<()> {
        self.terminal.show_cursor()?;
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        if self.mode == ScreenMode::Dashboard {
            disable_raw_mode().context("failed to disable raw mode")?;
            execute!(io::stdout(), LeaveAlternateScreen)
                .context("failed to leave alternate screen")?;
            self.mode = ScreenMode::Released;
        }
        Ok(())
    }
}

fn claim() -> Result<()> {
    execute!(io::stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
    enable_raw_mode().context("failed to enable raw mode")?;
    Ok(())
}

impl Drop for Screen {
    fn drop(&mut self) {
        if self.mode == ScreenMode::Dashboard {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            let _ = self.terminal.show_cursor();
        }
    }
}
