//! Live refresh protocol
//!
//! A single repeating timer re-pulls the recent-blocks fragment so the
//! displayed window stays current. The protocol is an explicit state
//! machine ([`RefreshMachine`]) driven by named events; the async
//! driver ([`run_refresh_loop`]) wires it to a tokio interval and an
//! mpsc channel of user input, the same bridge shape the rest of the
//! crate uses between interactive code and RPC work.
//!
//! Two deliberate properties, kept rather than fixed: a fetch that
//! outlives the interval can overlap the next one (no de-duplication),
//! and fetch failures are swallowed without backoff.

pub mod prefs;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tracing::{debug, warn};

use crate::infrastructure::ethereum::NodeClient;
use crate::snapshot::fetch_recent_blocks;
use crate::view::{recent_blocks_fragment, Fragment, FragmentEntry};

pub use prefs::RefreshPrefs;

/// Fixed poll interval.
pub const REFRESH_INTERVAL: Duration = Duration::from_millis(4000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Disabled,
    Enabled,
}

/// Events the machine reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshEvent {
    UserToggledRefresh,
    Tick,
    FetchSucceeded(Fragment),
    FetchFailed(String),
    UserToggledFilter,
}

/// Side effects the driver executes on the machine's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    StartTimer,
    CancelTimer,
    IssueFetch,
    PersistPrefs,
    Redraw,
}

/// User input forwarded into the loop from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserInput {
    ToggleRefresh,
    ToggleFilter,
    Quit,
}

/// The timer-driven refresh state machine. Pure: all I/O is expressed
/// as [`Effect`]s for the driver to run.
#[derive(Debug, Clone)]
pub struct RefreshMachine {
    state: RefreshState,
    prefs: RefreshPrefs,
    fragment: Fragment,
}

impl RefreshMachine {
    pub fn new(prefs: RefreshPrefs) -> Self {
        let state = if prefs.auto_refresh {
            RefreshState::Enabled
        } else {
            RefreshState::Disabled
        };
        Self {
            state,
            prefs,
            fragment: Fragment { entries: Vec::new() },
        }
    }

    pub fn state(&self) -> RefreshState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == RefreshState::Enabled
    }

    pub fn prefs(&self) -> RefreshPrefs {
        self.prefs
    }

    pub fn fragment(&self) -> &Fragment {
        &self.fragment
    }

    /// The entries a display should show right now: the held fragment
    /// with the transactions-only filter applied when it is on.
    pub fn visible_entries(&self) -> Vec<&FragmentEntry> {
        self.fragment
            .entries
            .iter()
            .filter(|entry| !self.prefs.filter_tx_only || entry.tx_count > 0)
            .collect()
    }

    pub fn apply(&mut self, event: RefreshEvent) -> Vec<Effect> {
        match event {
            RefreshEvent::UserToggledRefresh => match self.state {
                RefreshState::Disabled => {
                    self.state = RefreshState::Enabled;
                    self.prefs.auto_refresh = true;
                    // Enabling fetches immediately rather than waiting
                    // out the first interval.
                    vec![Effect::StartTimer, Effect::IssueFetch, Effect::PersistPrefs]
                }
                RefreshState::Enabled => {
                    self.state = RefreshState::Disabled;
                    self.prefs.auto_refresh = false;
                    vec![Effect::CancelTimer, Effect::PersistPrefs]
                }
            },
            RefreshEvent::Tick => match self.state {
                RefreshState::Enabled => vec![Effect::IssueFetch],
                RefreshState::Disabled => Vec::new(),
            },
            RefreshEvent::FetchSucceeded(fragment) => {
                self.fragment = fragment;
                vec![Effect::Redraw]
            }
            // Best-effort polling: keep showing what we have, keep
            // ticking, tell nobody.
            RefreshEvent::FetchFailed(_) => Vec::new(),
            RefreshEvent::UserToggledFilter => {
                self.prefs.filter_tx_only = !self.prefs.filter_tx_only;
                vec![Effect::Redraw, Effect::PersistPrefs]
            }
        }
    }
}

/// Source of recent-block fragments for the poll.
#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync + 'static {
    async fn fetch_fragment(&self) -> anyhow::Result<Fragment>;
}

/// Fragment source backed by the narrow aggregation against the node.
pub struct NodeFragmentSource {
    client: Arc<dyn NodeClient>,
    window: u64,
}

impl NodeFragmentSource {
    pub fn new(client: Arc<dyn NodeClient>, window: u64) -> Self {
        Self { client, window }
    }
}

#[async_trait::async_trait]
impl FragmentSource for NodeFragmentSource {
    async fn fetch_fragment(&self) -> anyhow::Result<Fragment> {
        let blocks = fetch_recent_blocks(self.client.as_ref(), self.window).await?;
        Ok(recent_blocks_fragment(&blocks))
    }
}

/// Drive the refresh machine until the user quits or the input channel
/// closes. Visible entries are sent over `update_tx` on every redraw.
///
/// Fetches run in spawned tasks reporting back over an internal
/// channel, so a slow fetch never keeps the timer from firing the next
/// tick.
pub async fn run_refresh_loop(
    source: Arc<dyn FragmentSource>,
    prefs: RefreshPrefs,
    mut user_rx: mpsc::Receiver<UserInput>,
    update_tx: mpsc::UnboundedSender<Vec<FragmentEntry>>,
) {
    let mut machine = RefreshMachine::new(prefs);
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<RefreshEvent>();
    let mut ticker = interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);

    // An initially-enabled machine starts with one immediate fetch.
    if machine.is_enabled() {
        issue_fetch(&source, &evt_tx);
    }

    loop {
        let event = tokio::select! {
            _ = ticker.tick(), if machine.is_enabled() => RefreshEvent::Tick,
            Some(event) = evt_rx.recv() => event,
            input = user_rx.recv() => match input {
                Some(UserInput::ToggleRefresh) => RefreshEvent::UserToggledRefresh,
                Some(UserInput::ToggleFilter) => RefreshEvent::UserToggledFilter,
                Some(UserInput::Quit) | None => return,
            },
        };

        for effect in machine.apply(event) {
            match effect {
                Effect::StartTimer => {
                    ticker = interval_at(Instant::now() + REFRESH_INTERVAL, REFRESH_INTERVAL);
                }
                // The tick arm is guarded on `is_enabled`, so there is
                // no live timer to tear down.
                Effect::CancelTimer => {}
                Effect::IssueFetch => issue_fetch(&source, &evt_tx),
                Effect::PersistPrefs => {
                    if let Err(err) = prefs::save(&machine.prefs()) {
                        warn!("Failed to persist refresh preferences: {err:#}");
                    }
                }
                Effect::Redraw => {
                    let entries: Vec<FragmentEntry> =
                        machine.visible_entries().into_iter().cloned().collect();
                    if update_tx.send(entries).is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn issue_fetch(source: &Arc<dyn FragmentSource>, evt_tx: &mpsc::UnboundedSender<RefreshEvent>) {
    let source = Arc::clone(source);
    let evt_tx = evt_tx.clone();
    tokio::spawn(async move {
        let event = match source.fetch_fragment().await {
            Ok(fragment) => RefreshEvent::FetchSucceeded(fragment),
            Err(err) => {
                debug!("Fragment fetch failed: {err:#}");
                RefreshEvent::FetchFailed(format!("{err:#}"))
            }
        };
        let _ = evt_tx.send(event);
    });
}
