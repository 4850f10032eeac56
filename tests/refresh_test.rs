//! Refresh state machine and driver tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anvil_lens::refresh::{
    prefs, run_refresh_loop, Effect, FragmentSource, RefreshEvent, RefreshMachine, RefreshPrefs,
    RefreshState, UserInput,
};
use anvil_lens::view::{Fragment, FragmentEntry};
use tokio::sync::mpsc;

fn fragment(entries: &[(u64, usize)]) -> Fragment {
    Fragment {
        entries: entries
            .iter()
            .map(|&(number, tx_count)| FragmentEntry {
                number,
                tx_count,
                hash: format!("0x{:064x}", number),
            })
            .collect(),
    }
}

fn disabled_prefs() -> RefreshPrefs {
    RefreshPrefs {
        auto_refresh: false,
        filter_tx_only: false,
    }
}

#[test]
fn initial_state_follows_persisted_preference() {
    assert_eq!(
        RefreshMachine::new(RefreshPrefs::default()).state(),
        RefreshState::Enabled
    );
    assert_eq!(
        RefreshMachine::new(disabled_prefs()).state(),
        RefreshState::Disabled
    );
}

#[test]
fn enabling_starts_timer_and_fetches_immediately() {
    let mut machine = RefreshMachine::new(disabled_prefs());
    let effects = machine.apply(RefreshEvent::UserToggledRefresh);

    assert_eq!(
        effects,
        vec![Effect::StartTimer, Effect::IssueFetch, Effect::PersistPrefs]
    );
    assert!(machine.is_enabled());
    assert!(machine.prefs().auto_refresh);
}

#[test]
fn disabling_cancels_the_timer() {
    let mut machine = RefreshMachine::new(RefreshPrefs::default());
    let effects = machine.apply(RefreshEvent::UserToggledRefresh);

    assert_eq!(effects, vec![Effect::CancelTimer, Effect::PersistPrefs]);
    assert!(!machine.is_enabled());
    assert!(!machine.prefs().auto_refresh);
}

#[test]
fn ticks_fetch_only_while_enabled() {
    let mut machine = RefreshMachine::new(RefreshPrefs::default());
    assert_eq!(machine.apply(RefreshEvent::Tick), vec![Effect::IssueFetch]);

    machine.apply(RefreshEvent::UserToggledRefresh);
    assert_eq!(machine.apply(RefreshEvent::Tick), Vec::new());
}

#[test]
fn fetch_failure_keeps_the_current_fragment_and_the_timer() {
    let mut machine = RefreshMachine::new(RefreshPrefs::default());
    machine.apply(RefreshEvent::FetchSucceeded(fragment(&[(10, 1)])));

    let effects = machine.apply(RefreshEvent::FetchFailed("timeout".to_string()));
    assert_eq!(effects, Vec::new());
    assert_eq!(machine.fragment(), &fragment(&[(10, 1)]));

    // Still ticking afterwards, no backoff.
    assert_eq!(machine.apply(RefreshEvent::Tick), vec![Effect::IssueFetch]);
}

#[test]
fn filter_hides_zero_transaction_entries() {
    let mut machine = RefreshMachine::new(RefreshPrefs {
        auto_refresh: true,
        filter_tx_only: true,
    });
    machine.apply(RefreshEvent::FetchSucceeded(fragment(&[
        (12, 0),
        (11, 3),
        (10, 0),
    ])));

    let visible: Vec<u64> = machine.visible_entries().iter().map(|e| e.number).collect();
    assert_eq!(visible, vec![11]);
}

#[test]
fn toggling_filter_redraws_without_fetching() {
    let mut machine = RefreshMachine::new(RefreshPrefs::default());
    machine.apply(RefreshEvent::FetchSucceeded(fragment(&[(12, 0), (11, 3)])));

    let effects = machine.apply(RefreshEvent::UserToggledFilter);
    assert_eq!(effects, vec![Effect::Redraw, Effect::PersistPrefs]);
    assert!(machine.prefs().filter_tx_only);

    let visible: Vec<u64> = machine.visible_entries().iter().map(|e| e.number).collect();
    assert_eq!(visible, vec![11]);

    // Toggling back shows everything again.
    machine.apply(RefreshEvent::UserToggledFilter);
    let visible: Vec<u64> = machine.visible_entries().iter().map(|e| e.number).collect();
    assert_eq!(visible, vec![12, 11]);
}

struct CountingSource {
    outstanding: Arc<AtomicUsize>,
    max_outstanding: Arc<AtomicUsize>,
    delay: Duration,
}

#[async_trait::async_trait]
impl FragmentSource for CountingSource {
    async fn fetch_fragment(&self) -> anyhow::Result<Fragment> {
        let now = self.outstanding.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_outstanding.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
        Ok(fragment(&[(1, 1)]))
    }
}

#[tokio::test(start_paused = true)]
async fn slow_fetches_overlap_instead_of_blocking_the_timer() {
    let outstanding = Arc::new(AtomicUsize::new(0));
    let max_outstanding = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource {
        outstanding: Arc::clone(&outstanding),
        max_outstanding: Arc::clone(&max_outstanding),
        // Each fetch takes longer than two poll intervals.
        delay: Duration::from_millis(10_000),
    });

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, _update_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_refresh_loop(
        source,
        RefreshPrefs::default(),
        input_rx,
        update_tx,
    ));

    // Immediate fetch at t=0, ticks at 4s and 8s; all three are still
    // in flight at 9.5s.
    tokio::time::sleep(Duration::from_millis(9_500)).await;
    assert!(max_outstanding.load(Ordering::SeqCst) >= 2);

    input_tx.send(UserInput::Quit).await.unwrap();
    handle.await.unwrap();
}

struct StaticSource(Fragment);

#[async_trait::async_trait]
impl FragmentSource for StaticSource {
    async fn fetch_fragment(&self) -> anyhow::Result<Fragment> {
        Ok(self.0.clone())
    }
}

#[tokio::test(start_paused = true)]
async fn poll_updates_arrive_with_the_filter_applied() {
    let source = Arc::new(StaticSource(fragment(&[(5, 0), (4, 2)])));
    let prefs = RefreshPrefs {
        auto_refresh: true,
        filter_tx_only: true,
    };

    let (input_tx, input_rx) = mpsc::channel(8);
    let (update_tx, mut update_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run_refresh_loop(source, prefs, input_rx, update_tx));

    let entries = tokio::time::timeout(Duration::from_secs(5), update_rx.recv())
        .await
        .expect("no update before timeout")
        .expect("update channel closed");
    let numbers: Vec<u64> = entries.iter().map(|e| e.number).collect();
    assert_eq!(numbers, vec![4]);

    input_tx.send(UserInput::Quit).await.unwrap();
    handle.await.unwrap();
}

#[test]
fn prefs_default_when_missing_and_roundtrip_when_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("prefs.toml");
    std::env::set_var("ANVIL_LENS_PREFS", &path);

    // Missing file falls back to defaults.
    let loaded = prefs::load();
    assert!(loaded.auto_refresh);
    assert!(!loaded.filter_tx_only);

    let saved = RefreshPrefs {
        auto_refresh: false,
        filter_tx_only: true,
    };
    prefs::save(&saved).unwrap();
    assert_eq!(prefs::load(), saved);

    std::env::remove_var("ANVIL_LENS_PREFS");
}
