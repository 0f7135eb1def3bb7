//! Polling loop and per-feature edge detection

use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Local};
use reolink_api::{ApiError, CommandExecutor, ErrorKind};

use crate::action::ActionTemplate;
use crate::cancel::CancellationToken;
use crate::error::{Result, WatchError};
use crate::event::{Event, EventAction};
use crate::iter::{EventIterator, WatchHandle};
use crate::query::{Sample, StateQuery};

/// Default time between polls
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3);

/// Last known state of one feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureState {
    pub active: bool,
    pub last_changed_at: Option<DateTime<Local>>,
}

/// Outcome of a single poll
#[derive(Debug)]
pub enum Tick {
    /// All queries answered; holds the events that passed the filter
    Polled(Vec<Event>),
    /// A query failed transiently; no state was touched
    Skipped(ApiError),
}

/// Counters reported when a watch ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchSummary {
    pub ticks: u64,
    pub skipped_ticks: u64,
    pub events: u64,
    pub failed_actions: u64,
}

/// Turns periodic state polls into start/stop events
///
/// Every feature starts inactive. A tick that sees a feature flip emits one
/// event for it; a tick that sees the same state again emits nothing. The
/// filter only decides which events are handed out, never which state is
/// tracked.
pub struct EventWatcher<E: CommandExecutor> {
    executor: E,
    channel: u8,
    interval: Duration,
    configured_queries: Vec<StateQuery>,
    queries: Vec<StateQuery>,
    filter: Option<BTreeSet<String>>,
    action: Option<ActionTemplate>,
    states: BTreeMap<&'static str, FeatureState>,
}

impl<E: CommandExecutor> EventWatcher<E> {
    /// Watch motion and AI detection on channel 0 every three seconds
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            channel: 0,
            interval: DEFAULT_INTERVAL,
            configured_queries: StateQuery::ALL.to_vec(),
            queries: StateQuery::ALL.to_vec(),
            filter: None,
            action: None,
            states: BTreeMap::new(),
        }
    }

    pub fn with_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the polled queries; they run in the given order each tick
    pub fn with_queries(mut self, queries: impl IntoIterator<Item = StateQuery>) -> Self {
        self.configured_queries = queries.into_iter().collect();
        self.queries = self.configured_queries.clone();
        self
    }

    pub fn with_filter<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_filter(Some(features));
        self
    }

    /// Run `action` once per emitted event
    pub fn with_action(mut self, action: ActionTemplate) -> Self {
        self.action = Some(action);
        self
    }

    /// Restrict emitted events to `features`, or lift the restriction with `None`
    ///
    /// Takes effect from the next tick. Tracked state is left alone, so a
    /// feature that stayed active while filtered out is not reported again.
    pub fn set_filter<I, S>(&mut self, features: Option<I>)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = features.map(|f| f.into_iter().map(Into::into).collect());
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Queries still being polled
    pub fn queries(&self) -> &[StateQuery] {
        &self.queries
    }

    /// Last known state of a feature, if it has been seen
    pub fn state(&self, feature: &str) -> Option<FeatureState> {
        self.states.get(feature).copied()
    }

    /// Poll every query once and apply the transitions
    ///
    /// Auth failures end the watch. An unsupported query is dropped for the
    /// rest of the session. Any other failure skips the tick without
    /// touching state.
    pub fn tick(&mut self) -> Result<Tick> {
        let mut samples: Vec<Sample> = Vec::new();
        let mut index = 0;

        while index < self.queries.len() {
            let query = self.queries[index];
            match query.sample(&self.executor, self.channel) {
                Ok(found) => {
                    samples.extend(found);
                    index += 1;
                }
                Err(e) => match e.kind() {
                    ErrorKind::Auth => return Err(WatchError::Auth(e)),
                    ErrorKind::Unsupported => {
                        tracing::warn!(query = %query, error = %e, "query unsupported, no longer polling it");
                        self.queries.remove(index);
                    }
                    ErrorKind::Unreachable | ErrorKind::Device => {
                        tracing::warn!(query = %query, error = %e, "poll failed, skipping tick");
                        return Ok(Tick::Skipped(e));
                    }
                },
            }
        }

        if self.queries.is_empty() {
            return Err(WatchError::NothingToWatch);
        }

        Ok(Tick::Polled(self.apply(samples, Local::now())))
    }

    /// Run until `cancel` fires, handing each event to `on_event`
    ///
    /// Each run starts from scratch: every feature is inactive again and
    /// queries dropped as unsupported by an earlier run are polled again.
    /// Cancellation is checked between ticks only. The executor is closed on
    /// every return path.
    pub fn run<F>(&mut self, cancel: &CancellationToken, mut on_event: F) -> Result<WatchSummary>
    where
        F: FnMut(&Event),
    {
        self.states.clear();
        self.queries.clone_from(&self.configured_queries);

        tracing::info!(
            channel = self.channel,
            interval_ms = self.interval.as_millis() as u64,
            queries = ?self.queries,
            "watching for events"
        );

        let result = self.poll_until_cancelled(cancel, &mut on_event);
        self.executor.close();

        match &result {
            Ok(summary) => tracing::info!(?summary, "watch finished"),
            Err(e) => tracing::error!(error = %e, "watch aborted"),
        }
        result
    }

    fn poll_until_cancelled(
        &mut self,
        cancel: &CancellationToken,
        on_event: &mut dyn FnMut(&Event),
    ) -> Result<WatchSummary> {
        let mut summary = WatchSummary::default();

        while !cancel.is_cancelled() {
            summary.ticks += 1;

            match self.tick()? {
                Tick::Polled(events) => {
                    for event in &events {
                        summary.events += 1;
                        on_event(event);
                        if let Some(action) = &self.action {
                            if let Err(e) = action.run(event) {
                                summary.failed_actions += 1;
                                tracing::warn!(error = %e, "event action failed");
                            }
                        }
                    }
                }
                Tick::Skipped(_) => summary.skipped_ticks += 1,
            }

            if cancel.wait_timeout(self.interval) {
                break;
            }
        }

        Ok(summary)
    }

    fn apply(&mut self, samples: Vec<Sample>, now: DateTime<Local>) -> Vec<Event> {
        let mut events = Vec::new();

        for sample in samples {
            let state = self.states.entry(sample.feature).or_default();
            if state.active == sample.active {
                continue;
            }

            state.active = sample.active;
            state.last_changed_at = Some(now);

            let action = EventAction::for_transition(sample.active);
            tracing::debug!(feature = sample.feature, %action, "state changed");

            if self.is_emitted(sample.feature) {
                events.push(Event::new(sample.feature, action, now));
            }
        }

        events
    }

    fn is_emitted(&self, feature: &str) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.contains(feature))
    }
}

impl<E: CommandExecutor + Send + 'static> EventWatcher<E> {
    /// Run the watch on a background thread
    ///
    /// Events arrive through the returned handle's iterator, which ends once
    /// the watch stops. Dropping the handle cancels the watch.
    pub fn spawn(mut self, cancel: CancellationToken) -> std::io::Result<WatchHandle> {
        let (tx, rx) = mpsc::channel();
        let worker_cancel = cancel.clone();

        let thread = thread::Builder::new()
            .name("reolink-watch".to_string())
            .spawn(move || {
                self.run(&worker_cancel, |event| {
                    // Receiver gone means the handle was dropped
                    if tx.send(event.clone()).is_err() {
                        worker_cancel.cancel();
                    }
                })
            })?;

        Ok(WatchHandle::new(EventIterator::new(rx), cancel, thread))
    }
}

impl<E: CommandExecutor> std::fmt::Debug for EventWatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventWatcher")
            .field("channel", &self.channel)
            .field("interval", &self.interval)
            .field("queries", &self.queries)
            .field("filter", &self.filter)
            .field("states", &self.states)
            .finish()
    }
}
