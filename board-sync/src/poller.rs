//! Change detection by polling the timestamp endpoint.
//!
//! Every tick asks the server for its current data token. The first answer
//! becomes the baseline; any later answer that differs means the table is
//! stale and the page should reload.

use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;

// =============================================================================
// ChangeToken
// =============================================================================

/// Opaque server marker of the current data version.
///
/// Only ever compared for equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeToken(String);

impl ChangeToken {
    /// Creates a token from the raw response body.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// Seams
// =============================================================================

/// Source of change tokens, usually `GET /timestamp`.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Fetches the current token.
    async fn fetch_token(&self) -> Result<ChangeToken, TransportError>;
}

/// What the poller reports to.
#[async_trait]
pub trait ReloadTrigger: Send + Sync {
    /// Current auto-reload preference, consulted on every tick.
    fn auto_reload_enabled(&self) -> bool;

    /// Called when a changed token is observed with auto-reload on.
    ///
    /// May be called more than once if requests overlap; implementations
    /// must treat repeated calls as harmless.
    async fn data_changed(&self);
}

// =============================================================================
// PollState
// =============================================================================

/// Lifecycle of a page's poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollPhase {
    /// No successful response yet.
    AwaitingBaseline,
    /// Baseline token known.
    Steady(ChangeToken),
    /// A reload was issued; the page is going away.
    Reloading,
}

/// Outcome of feeding one response into [`PollState::observe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// First token stored.
    Baseline,
    /// Same token as the baseline.
    Unchanged,
    /// Token differs and auto-reload is on: reload.
    Changed,
    /// Token differs but auto-reload is off.
    Suppressed,
    /// An older request finished after a newer one had been applied.
    Stale,
    /// The page is already reloading.
    Ignored,
}

struct PollInner {
    phase: PollPhase,
    issued: u64,
    applied: Option<u64>,
}

/// Token comparison state for one page.
///
/// Only response completions mutate it. Requests are numbered as they are
/// issued so a slow response cannot override one issued after it.
pub struct PollState {
    inner: Mutex<PollInner>,
}

impl Default for PollState {
    fn default() -> Self {
        Self::new()
    }
}

impl PollState {
    /// Creates a state awaiting its baseline.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PollInner {
                phase: PollPhase::AwaitingBaseline,
                issued: 0,
                applied: None,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PollInner> {
        // The guarded data is plain values, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Current phase.
    pub fn phase(&self) -> PollPhase {
        self.lock().phase.clone()
    }

    /// Returns `true` once a baseline token is known.
    pub fn has_baseline(&self) -> bool {
        matches!(self.lock().phase, PollPhase::Steady(_))
    }

    /// Returns `true` after [`mark_reloading`](Self::mark_reloading).
    pub fn is_reloading(&self) -> bool {
        matches!(self.lock().phase, PollPhase::Reloading)
    }

    /// The gate: decides whether this tick issues a request at all.
    ///
    /// Until the baseline is known a request always goes out. After that,
    /// ticks are skipped while auto-reload is off.
    pub fn should_poll(&self, auto_reload: bool) -> bool {
        match self.lock().phase {
            PollPhase::AwaitingBaseline => true,
            PollPhase::Steady(_) => auto_reload,
            PollPhase::Reloading => false,
        }
    }

    /// Numbers a new request.
    pub fn begin(&self) -> u64 {
        let mut inner = self.lock();
        inner.issued += 1;
        inner.issued
    }

    /// Applies the token returned by request `seq`.
    ///
    /// The baseline is never replaced by a differing token; the reload that
    /// follows makes further comparisons moot.
    pub fn observe(&self, seq: u64, token: ChangeToken, auto_reload: bool) -> Observation {
        let mut inner = self.lock();
        if inner.applied.is_some_and(|applied| seq < applied) {
            return Observation::Stale;
        }

        let observation = match &inner.phase {
            PollPhase::Reloading => return Observation::Ignored,
            PollPhase::AwaitingBaseline => Observation::Baseline,
            PollPhase::Steady(baseline) if *baseline == token => Observation::Unchanged,
            PollPhase::Steady(_) if auto_reload => Observation::Changed,
            PollPhase::Steady(_) => Observation::Suppressed,
        };
        if observation == Observation::Baseline {
            inner.phase = PollPhase::Steady(token);
        }
        inner.applied = Some(seq);
        observation
    }

    /// Enters the terminal phase.
    pub fn mark_reloading(&self) {
        self.lock().phase = PollPhase::Reloading;
    }
}

impl fmt::Debug for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("PollState")
            .field("phase", &inner.phase)
            .field("issued", &inner.issued)
            .field("applied", &inner.applied)
            .finish()
    }
}

// =============================================================================
// Poller
// =============================================================================

/// Periodic change check for one page.
///
/// # Example
///
/// ```ignore
/// let poller = Poller::new(source, state, Duration::from_secs(1), Duration::from_millis(900));
/// tokio::spawn(poller.run(coordinator, cancel));
/// ```
pub struct Poller {
    source: Arc<dyn ChangeSource>,
    state: Arc<PollState>,
    interval: Duration,
    timeout: Duration,
}

impl Poller {
    /// Creates a poller.
    ///
    /// `timeout` bounds each request; keep it under `interval`.
    pub fn new(
        source: Arc<dyn ChangeSource>,
        state: Arc<PollState>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            state,
            interval,
            timeout,
        }
    }

    /// Polls until the page reloads or `cancel` fires.
    ///
    /// The first check runs immediately. Each request runs in its own task so
    /// a slow response never delays the next tick; requests still in flight
    /// when the page goes away are abandoned.
    pub async fn run(self, trigger: Arc<dyn ReloadTrigger>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if self.state.is_reloading() {
                break;
            }
            if !self.state.should_poll(trigger.auto_reload_enabled()) {
                continue;
            }

            let seq = self.state.begin();
            let source = Arc::clone(&self.source);
            let state = Arc::clone(&self.state);
            let trigger = Arc::clone(&trigger);
            let cancel = cancel.clone();
            let timeout = self.timeout;

            tokio::spawn(async move {
                let result = tokio::select! {
                    _ = cancel.cancelled() => return,
                    result = check(source.as_ref(), timeout) => result,
                };

                let token = match result {
                    Ok(token) => token,
                    Err(e) => {
                        debug!("Change poll #{} failed: {}", seq, e);
                        return;
                    }
                };

                match state.observe(seq, token, trigger.auto_reload_enabled()) {
                    Observation::Changed => {
                        info!("Change poll #{} saw new data, reloading", seq);
                        trigger.data_changed().await;
                    }
                    observation => debug!("Change poll #{}: {:?}", seq, observation),
                }
            });
        }
    }
}

/// Fetches one token with a deadline.
pub async fn check(source: &dyn ChangeSource, timeout: Duration) -> Result<ChangeToken, TransportError> {
    match tokio::time::timeout(timeout, source.fetch_token()).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicBool;
    use std::sync::atomic::AtomicUsize;
    use std::sync::atomic::Ordering;

    use super::*;

    fn token(s: &str) -> ChangeToken {
        ChangeToken::new(s)
    }

    #[test]
    fn test_baseline_then_unchanged() {
        let state = PollState::new();
        assert!(state.should_poll(false));

        let seq = state.begin();
        assert_eq!(state.observe(seq, token("t1"), false), Observation::Baseline);
        assert_eq!(state.phase(), PollPhase::Steady(token("t1")));

        let seq = state.begin();
        assert_eq!(state.observe(seq, token("t1"), true), Observation::Unchanged);
    }

    #[test]
    fn test_changed_keeps_baseline() {
        let state = PollState::new();
        let seq = state.begin();
        state.observe(seq, token("t1"), true);

        let seq = state.begin();
        assert_eq!(state.observe(seq, token("t2"), true), Observation::Changed);
        assert_eq!(state.phase(), PollPhase::Steady(token("t1")));
    }

    #[test]
    fn test_gate_after_baseline() {
        let state = PollState::new();
        assert!(state.should_poll(false));
        let seq = state.begin();
        state.observe(seq, token("t1"), false);

        assert!(!state.should_poll(false));
        assert!(state.should_poll(true));
    }

    #[test]
    fn test_change_suppressed_when_disabled() {
        let state = PollState::new();
        let seq = state.begin();
        state.observe(seq, token("t1"), false);

        let seq = state.begin();
        assert_eq!(state.observe(seq, token("t2"), false), Observation::Suppressed);
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let state = PollState::new();
        let slow = state.begin();
        let fast = state.begin();

        assert_eq!(state.observe(fast, token("t2"), true), Observation::Baseline);
        assert_eq!(state.observe(slow, token("t1"), true), Observation::Stale);
        assert_eq!(state.phase(), PollPhase::Steady(token("t2")));
    }

    #[test]
    fn test_reloading_is_terminal() {
        let state = PollState::new();
        let seq = state.begin();
        state.observe(seq, token("t1"), true);
        state.mark_reloading();

        assert!(!state.should_poll(true));
        let seq = state.begin();
        assert_eq!(state.observe(seq, token("t2"), true), Observation::Ignored);
        assert!(state.is_reloading());
    }

    // -------------------------------------------------------------------------
    // Poll loop
    // -------------------------------------------------------------------------

    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<ChangeToken, TransportError>>>,
        last: ChangeToken,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<&str, u16>>) -> Arc<Self> {
            let last = responses
                .iter()
                .rev()
                .find_map(|r| r.as_ref().ok())
                .map(|s| token(s))
                .unwrap_or_else(|| token("t0"));
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(token).map_err(|status| TransportError::http(status, "")))
                        .collect(),
                ),
                last,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ChangeSource for ScriptedSource {
        async fn fetch_token(&self) -> Result<ChangeToken, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(self.last.clone()))
        }
    }

    struct CountingTrigger {
        enabled: AtomicBool,
        reloads: AtomicUsize,
    }

    impl CountingTrigger {
        fn new(enabled: bool) -> Arc<Self> {
            Arc::new(Self {
                enabled: AtomicBool::new(enabled),
                reloads: AtomicUsize::new(0),
            })
        }

        fn reloads(&self) -> usize {
            self.reloads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ReloadTrigger for CountingTrigger {
        fn auto_reload_enabled(&self) -> bool {
            self.enabled.load(Ordering::SeqCst)
        }

        async fn data_changed(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn start(
        source: Arc<ScriptedSource>,
        trigger: Arc<CountingTrigger>,
    ) -> (Arc<PollState>, CancellationToken) {
        let state = Arc::new(PollState::new());
        let cancel = CancellationToken::new();
        let poller = Poller::new(
            source,
            Arc::clone(&state),
            Duration::from_secs(1),
            Duration::from_millis(900),
        );
        tokio::spawn(poller.run(trigger, cancel.clone()));
        (state, cancel)
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_tokens_never_reload() {
        let source = ScriptedSource::new(vec![Ok("t1"), Ok("t1"), Ok("t1")]);
        let trigger = CountingTrigger::new(true);
        let (_, cancel) = start(source.clone(), trigger.clone());

        tokio::time::sleep(Duration::from_millis(4500)).await;
        cancel.cancel();

        assert!(source.calls() >= 4);
        assert_eq!(trigger.reloads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_changed_token_reloads_once() {
        let source = ScriptedSource::new(vec![Ok("t1"), Ok("t2")]);
        let trigger = CountingTrigger::new(true);
        let (state, cancel) = start(source.clone(), trigger.clone());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(trigger.reloads(), 1);

        // The trigger here does not navigate away, so the page keeps polling
        // and keeps seeing t2; a real page would be gone by now.
        state.mark_reloading();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        cancel.cancel();
        assert_eq!(trigger.reloads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_polls_once_for_baseline() {
        let source = ScriptedSource::new(vec![Ok("t1"), Ok("t2"), Ok("t3")]);
        let trigger = CountingTrigger::new(false);
        let (state, cancel) = start(source.clone(), trigger.clone());

        tokio::time::sleep(Duration::from_millis(5500)).await;
        cancel.cancel();

        assert_eq!(source.calls(), 1);
        assert_eq!(trigger.reloads(), 0);
        assert_eq!(state.phase(), PollPhase::Steady(token("t1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reenabling_resumes_polling() {
        let source = ScriptedSource::new(vec![Ok("t1"), Ok("t2")]);
        let trigger = CountingTrigger::new(false);
        let (_, cancel) = start(source.clone(), trigger.clone());

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(trigger.reloads(), 0);

        trigger.enabled.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(1000)).await;
        cancel.cancel();

        assert_eq!(source.calls(), 2);
        assert_eq!(trigger.reloads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_ignored() {
        let source = ScriptedSource::new(vec![Err(503), Ok("t1"), Err(500), Ok("t1")]);
        let trigger = CountingTrigger::new(true);
        let (state, cancel) = start(source.clone(), trigger.clone());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        cancel.cancel();

        assert_eq!(trigger.reloads(), 0);
        assert_eq!(state.phase(), PollPhase::Steady(token("t1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_times_out() {
        struct Hanging;

        #[async_trait]
        impl ChangeSource for Hanging {
            async fn fetch_token(&self) -> Result<ChangeToken, TransportError> {
                std::future::pending().await
            }
        }

        let result = check(&Hanging, Duration::from_millis(900)).await;
        assert!(matches!(result, Err(TransportError::Timeout(_))));
    }
}
