use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;

use crate::config::{Config, Timeouts};
use crate::http::testing::{Behavior, TestServer};
use crate::http::{HttpTransport, Transport, TransportError};
use crate::store::Store;

use super::availability::{
    AvailabilityCache, AvailabilityRecord, FRESHNESS_WINDOW_MS, StatusOrigin, cache_key, now_ms,
};
use super::context::{AppContext, SourceCheck};
use super::error::{InvalidInput, SessionError};
use super::player::{
    self, LOAD_FAILED_NOTICE, PlaybackState, PlayerExit, PlayerLauncher, PlayerOutcome, Step,
};
use super::source::{SavedSource, SourceSelection};

struct FakeTransport {
    body: String,
    delay: Duration,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeTransport {
    fn answering(body: &str) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn stalling(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            body: r#"{"code":200,"list":[]}"#.to_string(),
            delay,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn get_text(&self, path: &str, query: &[(String, String)]) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .expect("lock seen")
            .push((path.to_string(), query.to_vec()));
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Ok(self.body.clone())
    }
}

struct FakeLauncher {
    exit: PlayerExit,
    launched: RefCell<Vec<(String, String)>>,
}

impl FakeLauncher {
    fn new(succeed: bool) -> Self {
        Self::exiting(if succeed {
            PlayerExit::Finished
        } else {
            PlayerExit::Failed(Some(2))
        })
    }

    fn exiting(exit: PlayerExit) -> Self {
        Self {
            exit,
            launched: RefCell::new(Vec::new()),
        }
    }
}

impl PlayerLauncher for FakeLauncher {
    fn launch(&self, title: &str, url: &str) -> Result<PlayerExit> {
        self.launched
            .borrow_mut()
            .push((title.to_string(), url.to_string()));
        Ok(self.exit)
    }
}

fn test_config(timeouts: Timeouts) -> Config {
    Config {
        api_base: "http://unused.invalid".to_string(),
        player_bin: PathBuf::from("mpv"),
        db_path: PathBuf::from(":memory:"),
        timeouts,
    }
}

fn short_timeouts() -> Timeouts {
    Timeouts {
        probe: Duration::from_millis(60),
        request: Duration::from_millis(60),
    }
}

fn context_with(transport: Arc<dyn Transport>, timeouts: Timeouts) -> AppContext {
    let store = Store::open_in_memory().expect("store");
    AppContext::new(store, transport, test_config(timeouts))
}

fn named(code: &str) -> SourceSelection {
    SourceSelection::Named(code.to_string())
}

fn episodes(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("https://cdn.test/ep{i}.m3u8")).collect()
}

fn handed_off(store: &Store, n: usize, index: usize) -> PlaybackState {
    let list = super::episode::EpisodeList::from_raw(&episodes(n));
    let state = PlaybackState::new("Show", list, index, Default::default()).expect("state");
    player::handoff(store, &state).expect("handoff");
    state
}

#[test]
fn blank_query_never_reaches_the_network() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());

    let err = ctx.search("   ", &named("heimuer")).expect_err("blank query");
    assert_eq!(err, SessionError::InvalidInput(InvalidInput::EmptyQuery));
    assert_eq!(err.notice(), "Please enter a search term");
    assert_eq!(transport.calls(), 0);
}

#[test]
fn detail_without_id_never_reaches_the_network() {
    let transport = FakeTransport::answering("{}");
    let ctx = context_with(transport.clone(), Timeouts::default());

    let err = ctx
        .open_title(" ", &named("heimuer"), None)
        .expect_err("missing id");
    assert_eq!(err.notice(), "Invalid video id");
    assert_eq!(transport.calls(), 0);
}

#[test]
fn search_sends_query_and_source_parameters() {
    let transport = FakeTransport::answering(
        r#"{"code":200,"list":[{"vod_id":9,"vod_name":"Found","source_name":"Src","source_code":"ffzy"}]}"#,
    );
    let ctx = context_with(transport.clone(), Timeouts::default());

    let items = ctx.search(" found ", &named("heimuer")).expect("search");
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, "9");
    assert_eq!(items[0].source, named("ffzy"));

    let seen = transport.seen.lock().expect("lock seen");
    assert_eq!(seen[0].0, "/api/search");
    assert!(seen[0].1.contains(&("wd".to_string(), "found".to_string())));
    assert!(seen[0].1.contains(&("source".to_string(), "heimuer".to_string())));
}

#[test]
fn slow_search_reports_timeout_notice() {
    let transport = FakeTransport::stalling(Duration::from_millis(500));
    let ctx = context_with(transport, short_timeouts());

    let err = ctx.search("slow", &named("heimuer")).expect_err("timeout");
    assert_eq!(err, SessionError::Timeout);
    assert_eq!(err.notice(), "Request timed out; check your network connection");
}

#[test]
fn rejected_search_over_http_surfaces_server_message() {
    let server = TestServer::spawn(vec![Behavior::Respond(
        400,
        r#"{"code":400,"msg":"source offline"}"#.to_string(),
    )]);
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&server.base_url, Duration::from_secs(2)));
    let ctx = context_with(transport, Timeouts::default());

    let err = ctx.search("anything", &named("heimuer")).expect_err("rejected");
    assert_eq!(err.notice(), "source offline");
    assert!(server.request_lines()[0].starts_with("GET /api/search?"));
}

#[test]
fn detail_over_http_keeps_only_playable_episodes() {
    let server = TestServer::spawn(vec![Behavior::Respond(
        200,
        r#"{"code":200,"videoInfo":{"title":"Remote","source_name":"Src"},"episodes":["https://a/1","ftp://b/2","http://c/3"]}"#
            .to_string(),
    )]);
    let transport: Arc<dyn Transport> =
        Arc::new(HttpTransport::new(&server.base_url, Duration::from_secs(2)));
    let ctx = context_with(transport, Timeouts::default());

    let session = ctx
        .open_title("42", &named("heimuer"), None)
        .expect("details");
    let details = session.details();
    assert_eq!(details.title, "Remote");
    assert_eq!(details.episodes.as_slice(), ["https://a/1", "http://c/3"]);
    assert!(!session.order().is_reversed());
}

#[test]
fn probe_timeout_is_cached_as_unavailable() {
    let transport = FakeTransport::stalling(Duration::from_millis(500));
    let ctx = context_with(transport, short_timeouts());
    let source = named("slowsrc");

    let status = ctx.availability().status(&source);
    assert!(!status.available);
    assert_eq!(status.origin, StatusOrigin::TimedOut);

    let record = AvailabilityCache::new(&ctx.store)
        .get(&cache_key(&source), now_ms())
        .expect("cached record");
    assert!(!record.is_available);
}

#[test]
fn fresh_cache_entry_skips_the_probe() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());
    let source = named("heimuer");
    AvailabilityCache::new(&ctx.store)
        .put(
            &cache_key(&source),
            &AvailabilityRecord {
                is_available: false,
                checked_at_ms: now_ms(),
            },
        )
        .expect("seed cache");

    let status = ctx.availability().status(&source);
    assert!(!status.available);
    assert_eq!(status.origin, StatusOrigin::Cached);
    assert_eq!(transport.calls(), 0);
}

#[test]
fn refreshed_status_ignores_fresh_cache() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());
    let source = named("heimuer");
    AvailabilityCache::new(&ctx.store)
        .put(
            &cache_key(&source),
            &AvailabilityRecord {
                is_available: false,
                checked_at_ms: now_ms(),
            },
        )
        .expect("seed cache");

    let status = ctx.availability().status_refreshed(&source);
    assert!(status.available);
    assert_eq!(status.origin, StatusOrigin::Probed);
    assert_eq!(transport.calls(), 1);
    assert_eq!(ctx.availability().status(&source).origin, StatusOrigin::Cached);
}

#[test]
fn stale_cache_entry_is_probed_again() {
    let transport = FakeTransport::answering(r#"{"code":400,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());
    let source = named("heimuer");
    AvailabilityCache::new(&ctx.store)
        .put(
            &cache_key(&source),
            &AvailabilityRecord {
                is_available: true,
                checked_at_ms: now_ms() - FRESHNESS_WINDOW_MS - 1,
            },
        )
        .expect("seed cache");

    let status = ctx.availability().status(&source);
    assert!(!status.available);
    assert_eq!(status.origin, StatusOrigin::Probed);
    assert_eq!(transport.calls(), 1);
}

#[test]
fn probe_asks_for_the_fixed_test_query() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());
    let custom = SourceSelection::Custom("https://mine.test/api".to_string());

    assert!(ctx.availability().status(&custom).available);
    let seen = transport.seen.lock().expect("lock seen");
    assert!(seen[0].1.contains(&("wd".to_string(), "test".to_string())));
    assert!(
        seen[0]
            .1
            .contains(&("customApi".to_string(), "https://mine.test/api".to_string()))
    );
}

#[test]
fn custom_source_waits_for_endpoint_before_checking() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());

    let check = ctx.change_source("custom", None).expect("change source");
    assert_eq!(check, SourceCheck::AwaitingUrl);
    assert_eq!(transport.calls(), 0);

    let check = ctx
        .change_source("custom", Some(" https://mine.test/api "))
        .expect("set url");
    assert!(matches!(check, SourceCheck::Checked(status) if status.available));
    let saved = SavedSource::load(&ctx.store);
    assert_eq!(saved.custom_url, "https://mine.test/api");
    assert!(saved.is_custom());
}

#[test]
fn source_codes_with_separators_are_not_saved() {
    let transport = FakeTransport::answering(r#"{"code":200,"list":[]}"#);
    let ctx = context_with(transport.clone(), Timeouts::default());
    ctx.change_source("ffzy", None).expect("change source");

    assert!(ctx.change_source("custom:https", None).is_err());
    assert_eq!(SavedSource::load(&ctx.store).code, "ffzy");
    assert_eq!(transport.calls(), 1);
}

#[test]
fn resume_without_handoff_launches_nothing() {
    let store = Store::open_in_memory().expect("store");
    let launcher = FakeLauncher::new(true);

    let outcome = player::resume(&store, &launcher).expect("resume");
    assert_eq!(outcome, PlayerOutcome::NothingToResume);
    assert!(launcher.launched.borrow().is_empty());
}

#[test]
fn next_hands_off_before_launching() {
    let store = Store::open_in_memory().expect("store");
    handed_off(&store, 3, 0);
    let launcher = FakeLauncher::new(true);

    let outcome = player::step(&store, Step::Next, &launcher).expect("step");
    assert_eq!(
        outcome,
        PlayerOutcome::Played {
            title: "Show".to_string(),
            index: 1
        }
    );
    assert_eq!(
        launcher.launched.borrow().as_slice(),
        [("Show".to_string(), "https://cdn.test/ep2.m3u8".to_string())]
    );
    let resumed = player::load_handoff(&store).expect("handoff");
    assert_eq!(resumed.current_index(), 1);
}

#[test]
fn stepping_past_either_end_writes_and_launches_nothing() {
    let store = Store::open_in_memory().expect("store");
    handed_off(&store, 2, 1);
    let launcher = FakeLauncher::new(true);
    let written = store.updated_at("playback.index").expect("stamp");
    assert!(written.is_some());
    std::thread::sleep(Duration::from_millis(5));

    let outcome = player::step(&store, Step::Next, &launcher).expect("step");
    assert_eq!(outcome, PlayerOutcome::AtEdge(Step::Next));
    assert_eq!(
        player::load_handoff(&store).expect("handoff").current_index(),
        1
    );
    assert_eq!(store.updated_at("playback.index").expect("stamp"), written);

    handed_off(&store, 2, 0);
    let written = store.updated_at("playback.index").expect("stamp");
    std::thread::sleep(Duration::from_millis(5));
    let outcome = player::step(&store, Step::Previous, &launcher).expect("step");
    assert_eq!(outcome, PlayerOutcome::AtEdge(Step::Previous));
    assert_eq!(outcome.message(), "Already at the first episode.");
    assert_eq!(store.updated_at("playback.index").expect("stamp"), written);
    assert!(launcher.launched.borrow().is_empty());
}

#[test]
fn interrupted_player_keeps_the_episode_for_resume() {
    let store = Store::open_in_memory().expect("store");
    handed_off(&store, 3, 0);
    let launcher = FakeLauncher::exiting(PlayerExit::Interrupted);

    let outcome = player::step(&store, Step::Next, &launcher).expect("step");
    assert_eq!(
        outcome,
        PlayerOutcome::Stopped {
            title: "Show".to_string(),
            index: 1
        }
    );
    assert_eq!(outcome.message(), "Stopped Show | episode 2");
    let resumed = player::load_handoff(&store).expect("handoff");
    assert_eq!(resumed.current_index(), 1);
}

#[test]
fn played_message_escapes_terminal_sequences_in_titles() {
    let outcome = PlayerOutcome::Played {
        title: "Evil\x1b]0;pwned\x07\x1b[2J".to_string(),
        index: 0,
    };
    let message = outcome.message();
    assert!(message.starts_with("Played Evil"));
    assert!(!message.contains('\u{1b}'));
    assert!(!message.contains('\u{7}'));
    assert!(message.ends_with("| episode 1"));
}

#[test]
fn failed_playback_reports_load_notice() {
    let store = Store::open_in_memory().expect("store");
    let state = handed_off(&store, 2, 0);
    let launcher = FakeLauncher::new(false);

    let outcome = player::start_playback(&store, &state, &launcher).expect("playback");
    assert_eq!(outcome, PlayerOutcome::LoadFailed(LOAD_FAILED_NOTICE.to_string()));
    assert_eq!(outcome.message(), "Video failed to load; try another source");
}

#[test]
fn reversed_order_survives_the_handoff() {
    let transport = FakeTransport::answering(
        r#"{"code":200,"episodes":["https://a/1","https://a/2","https://a/3"]}"#,
    );
    let ctx = context_with(transport, Timeouts::default());
    let mut session = ctx
        .open_title("7", &named("heimuer"), Some("Hinted"))
        .expect("details");
    session.toggle_order();

    let state = session.playback_at_display(0).expect("first slot");
    assert_eq!(state.current_index(), 2);
    let launcher = FakeLauncher::new(true);
    player::start_playback(&ctx.store, &state, &launcher).expect("playback");

    let resumed = player::load_handoff(&ctx.store).expect("handoff");
    assert_eq!(resumed.title(), "Hinted");
    assert!(resumed.order().is_reversed());
    assert_eq!(resumed.current_url(), "https://a/3");
}
