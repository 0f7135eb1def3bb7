//! Detection state queries polled on every tick

use std::fmt;

use reolink_api::{
    ApiError, CameraCommand, CommandExecutor, GetAiState, GetMdState,
};

/// Feature reported by `GetMdState`
pub const MOTION: &str = "motion";

/// AI detection keys as the device names them, and the feature each maps to
pub const AI_FEATURES: &[(&str, &str)] = &[
    ("people", "person"),
    ("vehicle", "vehicle"),
    ("dog_cat", "animal"),
];

/// Every feature name a watcher can emit
pub const KNOWN_FEATURES: &[&str] = &["person", "vehicle", "animal", "motion"];

/// One feature's state in a single poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub feature: &'static str,
    pub active: bool,
}

/// A state-query command the watcher polls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateQuery {
    /// `GetMdState`: the `motion` feature
    Motion,
    /// `GetAiState`: `person`, `vehicle` and `animal`, where supported
    AiDetection,
}

impl StateQuery {
    /// Default queries in poll order
    pub const ALL: [StateQuery; 2] = [StateQuery::AiDetection, StateQuery::Motion];

    /// Wire command name
    pub fn command(self) -> &'static str {
        match self {
            StateQuery::Motion => GetMdState::NAME,
            StateQuery::AiDetection => GetAiState::NAME,
        }
    }

    /// Run the query and extract per-feature samples
    ///
    /// AI types the device marks as unsupported are left out, so they never
    /// produce events.
    pub fn sample<E: CommandExecutor + ?Sized>(
        self,
        executor: &E,
        channel: u8,
    ) -> Result<Vec<Sample>, ApiError> {
        match self {
            StateQuery::Motion => {
                let command = GetMdState { channel };
                let value = executor.execute(GetMdState::NAME, command.params())?;
                let state = GetMdState::parse_response(value)?;
                Ok(vec![Sample {
                    feature: MOTION,
                    active: state.is_active(),
                }])
            }
            StateQuery::AiDetection => {
                let command = GetAiState { channel };
                let value = executor.execute(GetAiState::NAME, command.params())?;
                let state = GetAiState::parse_response(value)?;
                Ok(AI_FEATURES
                    .iter()
                    .filter_map(|&(key, feature)| {
                        state.supported(key).map(|detection| Sample {
                            feature,
                            active: detection.is_active(),
                        })
                    })
                    .collect())
            }
        }
    }
}

impl fmt::Display for StateQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}
