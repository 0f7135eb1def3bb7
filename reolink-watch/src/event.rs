//! Events emitted on detection state transitions

use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Direction of a state transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventAction {
    /// Inactive to active
    Start,
    /// Active to inactive
    Stop,
}

impl EventAction {
    /// The action for a transition into `active`
    pub fn for_transition(active: bool) -> Self {
        if active {
            EventAction::Start
        } else {
            EventAction::Stop
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EventAction::Start => "start",
            EventAction::Stop => "stop",
        }
    }
}

impl fmt::Display for EventAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected transition
///
/// Serializes as `{"type": "person", "action": "start", "timestamp": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Feature name: `motion`, `person`, `vehicle` or `animal`
    #[serde(rename = "type")]
    pub feature: String,
    pub action: EventAction,
    pub timestamp: DateTime<Local>,
}

impl Event {
    pub fn new(feature: impl Into<String>, action: EventAction, timestamp: DateTime<Local>) -> Self {
        Self {
            feature: feature.into(),
            action,
            timestamp,
        }
    }

    /// Timestamp in RFC 3339, second precision
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Secs, false)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.timestamp_rfc3339(), self.feature, self.action)
    }
}
