//! Edge-triggered detection events for Reolink cameras
//!
//! An [`EventWatcher`] polls the camera's motion and AI detection state at a
//! fixed interval and reports transitions, not samples: a person walking
//! into view yields one `start`, leaving yields one `stop`, and the polls in
//! between yield nothing.
//!
//! ```rust,ignore
//! use reolink_api::{CameraClient, ClientConfig};
//! use reolink_watch::{CancellationToken, EventWatcher};
//! use std::time::Duration;
//!
//! let client = CameraClient::new(ClientConfig::new("192.168.1.50", "secret"));
//! let cancel = CancellationToken::new();
//!
//! let mut watcher = EventWatcher::new(&client)
//!     .with_interval(Duration::from_secs(5))
//!     .with_filter(["person", "vehicle"]);
//!
//! // Blocks until `cancel.cancel()` is called from another thread
//! let summary = watcher.run(&cancel, |event| println!("{}", event))?;
//! ```
//!
//! For a non-blocking variant, [`EventWatcher::spawn`] runs the loop on a
//! background thread and returns a [`WatchHandle`] with an event iterator.

pub mod action;
pub mod cancel;
pub mod error;
pub mod event;
pub mod iter;
pub mod query;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use action::ActionTemplate;
pub use cancel::CancellationToken;
pub use error::{ActionError, Result, WatchError};
pub use event::{Event, EventAction};
pub use iter::{EventIterator, WatchHandle};
pub use query::{StateQuery, KNOWN_FEATURES};
pub use watcher::{EventWatcher, FeatureState, Tick, WatchSummary, DEFAULT_INTERVAL};
