use std::process::{Command as ProcessCommand, ExitStatus};

use anyhow::{Context, Result};

#[cfg(unix)]
use std::os::unix::process::{CommandExt, ExitStatusExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PlayerExit {
    Finished,
    Failed(Option<i32>),
    // Killed by a signal, typically the user's Ctrl-C reaching the player.
    Interrupted,
}

impl PlayerExit {
    pub(crate) fn classify(status: ExitStatus) -> Self {
        if status.success() {
            Self::Finished
        } else if killed_by_signal(&status) {
            Self::Interrupted
        } else {
            Self::Failed(status.code())
        }
    }
}

#[cfg(unix)]
fn killed_by_signal(status: &ExitStatus) -> bool {
    status.signal().is_some()
}

#[cfg(not(unix))]
fn killed_by_signal(_status: &ExitStatus) -> bool {
    false
}

// While the player runs it owns the terminal: it becomes the foreground
// process group and Ctrl-C only reaches it. Everything is restored on drop.
#[cfg(unix)]
struct TerminalLease {
    tty_fd: libc::c_int,
    our_pgrp: libc::pid_t,
    saved: Vec<(libc::c_int, libc::sigaction)>,
    lent: bool,
}

#[cfg(unix)]
impl TerminalLease {
    fn acquire(tty_fd: libc::c_int) -> Result<Self> {
        let our_pgrp = unsafe { libc::tcgetpgrp(tty_fd) };
        let mut lease = Self {
            tty_fd,
            our_pgrp,
            saved: Vec::with_capacity(2),
            lent: false,
        };
        lease.ignore(libc::SIGINT)?;
        // Piped or headless runs have no terminal to hand over.
        if lease.has_terminal() {
            lease.ignore(libc::SIGTTOU)?;
        }
        Ok(lease)
    }

    fn has_terminal(&self) -> bool {
        self.our_pgrp != -1
    }

    fn ignore(&mut self, signum: libc::c_int) -> Result<()> {
        let previous = unsafe {
            let mut action: libc::sigaction = std::mem::zeroed();
            action.sa_sigaction = libc::SIG_IGN;
            libc::sigemptyset(&mut action.sa_mask);
            let mut previous: libc::sigaction = std::mem::zeroed();
            if libc::sigaction(signum, &action, &mut previous) != 0 {
                return Err(std::io::Error::last_os_error())
                    .with_context(|| format!("failed to ignore signal {signum}"));
            }
            previous
        };
        self.saved.push((signum, previous));
        Ok(())
    }

    fn lend_to(&mut self, child_pgrp: libc::pid_t) {
        if self.has_terminal() {
            self.lent = unsafe { libc::tcsetpgrp(self.tty_fd, child_pgrp) == 0 };
        }
    }
}

#[cfg(unix)]
impl Drop for TerminalLease {
    fn drop(&mut self) {
        unsafe {
            if self.lent {
                let _ = libc::tcsetpgrp(self.tty_fd, self.our_pgrp);
            }
            for (signum, previous) in self.saved.drain(..).rev() {
                let _ = libc::sigaction(signum, &previous, std::ptr::null_mut());
            }
        }
    }
}

#[cfg(unix)]
pub(crate) fn run_player(mut cmd: ProcessCommand) -> Result<PlayerExit> {
    let mut lease = TerminalLease::acquire(libc::STDIN_FILENO)?;

    unsafe {
        cmd.pre_exec(|| {
            libc::signal(libc::SIGINT, libc::SIG_DFL);
            libc::signal(libc::SIGQUIT, libc::SIG_DFL);
            libc::signal(libc::SIGTSTP, libc::SIG_DFL);
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = cmd.spawn().context("failed to spawn player")?;
    lease.lend_to(child.id() as libc::pid_t);
    let status = child.wait().context("failed waiting on player")?;
    drop(lease);
    Ok(PlayerExit::classify(status))
}

#[cfg(not(unix))]
pub(crate) fn run_player(mut cmd: ProcessCommand) -> Result<PlayerExit> {
    let status = cmd.status().context("failed to launch player")?;
    Ok(PlayerExit::classify(status))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_and_signals_are_told_apart() {
        assert_eq!(PlayerExit::classify(ExitStatus::from_raw(0)), PlayerExit::Finished);
        // Raw wait status: exit code in the high byte.
        assert_eq!(
            PlayerExit::classify(ExitStatus::from_raw(2 << 8)),
            PlayerExit::Failed(Some(2))
        );
        assert_eq!(
            PlayerExit::classify(ExitStatus::from_raw(libc::SIGINT)),
            PlayerExit::Interrupted
        );
    }

    #[test]
    fn missing_binary_is_a_launch_error() {
        let cmd = ProcessCommand::new("/nonexistent/vidseek-player");
        assert!(run_player(cmd).is_err());
    }
}
