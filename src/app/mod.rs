mod availability;
mod context;
mod deadline;
mod detail;
mod display;
mod episode;
mod error;
mod player;
mod request;
mod search;
mod sequence;
mod source;
mod tui;

#[cfg(test)]
mod tests;

use anyhow::Result;

use crate::cli::{Cli, Command};
use crate::config::Config;

use self::availability::{SourceStatus, StatusOrigin};
use self::context::{AppContext, SourceCheck, TitleSession};
use self::display::{ResultCard, escape_markup};
use self::error::SessionError;
use self::player::{PlayerOutcome, ProcessLauncher, Step};

pub fn run(cli: Cli) -> Result<()> {
    let ctx = AppContext::open(Config::from_env()?)?;

    match cli.command {
        Some(Command::Search { query, source }) => {
            run_search(&ctx, &query.join(" "), source.as_deref())?
        }
        Some(Command::Detail {
            id,
            source,
            title,
            reverse,
        }) => run_detail(&ctx, &id, source.as_deref(), title.as_deref(), reverse)?,
        Some(Command::Play {
            id,
            episode,
            source,
            title,
        }) => run_play(&ctx, &id, episode, source.as_deref(), title.as_deref())?,
        Some(Command::Resume) => run_player(&ctx, None)?,
        Some(Command::Next) => run_player(&ctx, Some(Step::Next))?,
        Some(Command::Previous) => run_player(&ctx, Some(Step::Previous))?,
        Some(Command::Source { code, custom_url }) => {
            run_source(&ctx, code.as_deref(), custom_url.as_deref())?
        }
        Some(Command::Status { refresh }) => run_status(&ctx, refresh)?,
        Some(Command::Tui) | None => tui::run_tui(&ctx)?,
    }

    Ok(())
}

fn run_search(ctx: &AppContext, query: &str, source: Option<&str>) -> Result<()> {
    let source = ctx.resolve_source(source)?;
    eprintln!("Searching {source}...");
    let items = match ctx.search(query, &source) {
        Ok(items) => items,
        Err(err) => {
            print_session_error(&err);
            return Ok(());
        }
    };

    if items.is_empty() {
        println!("No results for \"{}\".", escape_markup(query.trim()));
        return Ok(());
    }

    println!(
        "{} result(s) for \"{}\" from {source}:",
        items.len(),
        escape_markup(query.trim())
    );
    for (idx, item) in items.iter().enumerate() {
        for line in ResultCard::from_item(item).listing(idx + 1) {
            println!("{line}");
        }
    }
    Ok(())
}

fn run_detail(
    ctx: &AppContext,
    id: &str,
    source: Option<&str>,
    title: Option<&str>,
    reverse: bool,
) -> Result<()> {
    let source = ctx.resolve_source(source)?;
    eprintln!("Loading details...");
    let mut session = match ctx.open_title(id, &source, title) {
        Ok(session) => session,
        Err(err) => {
            print_session_error(&err);
            return Ok(());
        }
    };
    if reverse {
        session.toggle_order();
    }
    print_title_session(&session);
    Ok(())
}

fn print_title_session(session: &TitleSession) {
    let details = session.details();
    match details.source_label.as_deref() {
        Some(label) => println!(
            "{} ({})",
            escape_markup(&details.title),
            escape_markup(label)
        ),
        None => println!(
            "{} ({})",
            escape_markup(&details.title),
            escape_markup(&details.source.to_string())
        ),
    }

    if !details.has_playable_video() {
        println!("No playable video found.");
        return;
    }

    let order = if session.order().is_reversed() {
        "last episode first"
    } else {
        "first episode first"
    };
    println!("{} episode(s), {order}:", details.episodes.len());
    for slot in session.slots() {
        println!("  {:<12} {}", slot.label(), slot.url);
    }
}

fn run_play(
    ctx: &AppContext,
    id: &str,
    episode: usize,
    source: Option<&str>,
    title: Option<&str>,
) -> Result<()> {
    let source = ctx.resolve_source(source)?;
    let session = match ctx.open_title(id, &source, title) {
        Ok(session) => session,
        Err(err) => {
            print_session_error(&err);
            return Ok(());
        }
    };
    let details = session.details();
    if !details.has_playable_video() {
        println!("No playable video found for {}.", escape_markup(&details.title));
        return Ok(());
    }

    let Some(state) = episode
        .checked_sub(1)
        .and_then(|index| session.playback_at(index))
    else {
        println!(
            "Episode {episode} does not exist; {} has {} episode(s).",
            escape_markup(&details.title),
            details.episodes.len()
        );
        return Ok(());
    };

    let launcher = ProcessLauncher::new(ctx.config.player_bin.clone());
    let outcome = match player::start_playback(&ctx.store, &state, &launcher) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("Player launch failed: {err:#}");
            return Ok(());
        }
    };
    println!("{}", outcome.message());
    Ok(())
}

fn run_player(ctx: &AppContext, step: Option<Step>) -> Result<()> {
    let launcher = ProcessLauncher::new(ctx.config.player_bin.clone());
    let outcome = match step {
        Some(direction) => player::step(&ctx.store, direction, &launcher),
        None => player::resume(&ctx.store, &launcher),
    };
    match outcome {
        Ok(outcome @ PlayerOutcome::LoadFailed(_)) => eprintln!("{}", outcome.message()),
        Ok(outcome) => println!("{}", outcome.message()),
        Err(err) => println!("Player launch failed: {err:#}"),
    }
    Ok(())
}

fn run_source(ctx: &AppContext, code: Option<&str>, custom_url: Option<&str>) -> Result<()> {
    let Some(code) = code else {
        let saved = ctx.saved_source();
        println!("Current source: {}", saved.code);
        if saved.is_custom() || !saved.custom_url.is_empty() {
            let url = if saved.custom_url.is_empty() {
                "(not set)"
            } else {
                saved.custom_url.as_str()
            };
            println!("Custom endpoint: {url}");
        }
        return Ok(());
    };

    eprintln!("Testing source availability...");
    match ctx.change_source(code, custom_url)? {
        SourceCheck::AwaitingUrl => println!(
            "Switched to the custom source. Set its endpoint with `vidseek source custom --custom-url <url>`."
        ),
        SourceCheck::Checked(status) => {
            println!("Switched to {}.", code.trim());
            if code.trim() == source::CUSTOM_CODE {
                println!(
                    "{}",
                    if status.available {
                        "Endpoint available"
                    } else {
                        "Endpoint unavailable; check the address"
                    }
                );
            } else {
                println!("{}", status_line(&status));
            }
        }
    }
    Ok(())
}

fn run_status(ctx: &AppContext, refresh: bool) -> Result<()> {
    let saved = ctx.saved_source();
    if saved.is_custom() && saved.custom_url.is_empty() {
        println!("Custom source has no endpoint yet; nothing to test.");
        return Ok(());
    }
    let source = saved.selection()?;
    let checker = ctx.availability();
    let status = if refresh {
        checker.status_refreshed(&source)
    } else {
        checker.status(&source)
    };
    println!("{source}: {}", status_line(&status));
    Ok(())
}

pub(crate) fn status_line(status: &SourceStatus) -> String {
    let state = if status.available {
        "available"
    } else {
        "unavailable"
    };
    match status.origin {
        StatusOrigin::Cached => format!("● {state} (cached)"),
        StatusOrigin::Probed => format!("● {state}"),
        StatusOrigin::TimedOut => format!("● {state} (probe timed out)"),
    }
}

fn print_session_error(err: &SessionError) {
    if err.is_input_problem() {
        println!("{}", err.notice());
    } else {
        eprintln!("{}", err.notice());
    }
}
