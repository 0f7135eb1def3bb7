//! Blocking access to events from a background watch
//!
//! Mirrors the shape of a plain `mpsc` receiver so callers can consume
//! events without async/await.

use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::cancel::CancellationToken;
use crate::error::{Result, WatchError};
use crate::event::Event;
use crate::watcher::WatchSummary;

/// Blocking iterator over emitted events
///
/// `next()` blocks until an event arrives and returns `None` once the
/// watch has stopped and every queued event has been read.
pub struct EventIterator {
    rx: mpsc::Receiver<Event>,
}

impl EventIterator {
    pub(crate) fn new(rx: mpsc::Receiver<Event>) -> Self {
        Self { rx }
    }

    /// Block until an event is available
    ///
    /// Returns `None` if the watch has stopped.
    pub fn recv(&self) -> Option<Event> {
        self.rx.recv().ok()
    }

    /// Returns `None` if no event is currently queued
    pub fn try_recv(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Block until an event is available or `timeout` expires
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Event> {
        self.rx.recv_timeout(timeout).ok()
    }

    /// Non-blocking iterator over the events queued right now
    pub fn try_iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.rx.try_iter()
    }
}

impl Iterator for EventIterator {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.recv()
    }
}

/// A watch running on its own thread
///
/// Dropping the handle cancels the watch; the worker finishes its current
/// tick, closes the executor and exits.
pub struct WatchHandle {
    events: EventIterator,
    cancel: CancellationToken,
    thread: Option<JoinHandle<Result<WatchSummary>>>,
}

impl WatchHandle {
    pub(crate) fn new(
        events: EventIterator,
        cancel: CancellationToken,
        thread: JoinHandle<Result<WatchSummary>>,
    ) -> Self {
        Self {
            events,
            cancel,
            thread: Some(thread),
        }
    }

    pub fn events(&self) -> &EventIterator {
        &self.events
    }

    /// Ask the watch to stop after the current tick
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the watch to end and return its outcome
    ///
    /// Does not cancel; call [`cancel`](Self::cancel) first to stop a
    /// watch that would otherwise run forever.
    pub fn join(mut self) -> Result<WatchSummary> {
        match self.thread.take() {
            Some(thread) => thread.join().map_err(|_| WatchError::WorkerPanicked)?,
            None => Err(WatchError::WorkerPanicked),
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
