//! Motion and AI detection state queries
//!
//! These are the two commands the event watcher polls on every tick.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::command::CameraCommand;
use crate::error::{ApiError, Result};

/// Query the current motion-detection trigger state
#[derive(Debug, Clone, Copy, Default)]
pub struct GetMdState {
    pub channel: u8,
}

/// Motion trigger state as reported by `GetMdState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionState {
    #[serde(default)]
    pub channel: u8,
    #[serde(default)]
    pub state: i64,
}

impl MotionState {
    pub fn is_active(&self) -> bool {
        self.state == 1
    }
}

impl CameraCommand for GetMdState {
    type Response = MotionState;
    const NAME: &'static str = "GetMdState";

    fn params(&self) -> Option<Value> {
        Some(json!({"channel": self.channel}))
    }
}

/// Query the current per-type AI detection state
#[derive(Debug, Clone, Copy, Default)]
pub struct GetAiState {
    pub channel: u8,
}

/// State of one AI detection type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AiDetection {
    #[serde(default)]
    pub alarm_state: i64,
    #[serde(default)]
    pub support: i64,
}

impl AiDetection {
    pub fn is_supported(&self) -> bool {
        self.support != 0
    }

    pub fn is_active(&self) -> bool {
        self.alarm_state == 1
    }
}

/// AI detection state keyed by the device's type name (`people`, `vehicle`, `dog_cat`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct AiState {
    pub channel: u8,
    pub detections: BTreeMap<String, AiDetection>,
}

impl AiState {
    /// Decode a `GetAiState` payload
    ///
    /// Every object-valued entry is a detection type; scalar entries such as
    /// `channel` are metadata.
    pub fn from_value(value: &Value) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| ApiError::unparseable(GetAiState::NAME, "expected an object"))?;

        let mut detections = BTreeMap::new();
        for (key, entry) in object {
            if entry.is_object() {
                let detection: AiDetection = serde_json::from_value(entry.clone())
                    .map_err(|e| ApiError::unparseable(GetAiState::NAME, e))?;
                detections.insert(key.clone(), detection);
            }
        }

        let channel = object
            .get("channel")
            .and_then(Value::as_u64)
            .and_then(|c| u8::try_from(c).ok())
            .unwrap_or(0);

        Ok(Self {
            channel,
            detections,
        })
    }

    /// A detection type, only if the device supports it on this channel
    pub fn supported(&self, key: &str) -> Option<AiDetection> {
        self.detections.get(key).copied().filter(AiDetection::is_supported)
    }
}

impl<'de> Deserialize<'de> for AiState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        AiState::from_value(&value).map_err(serde::de::Error::custom)
    }
}

impl CameraCommand for GetAiState {
    type Response = AiState;
    const NAME: &'static str = "GetAiState";

    fn params(&self) -> Option<Value> {
        Some(json!({"channel": self.channel}))
    }

    fn parse_response(value: Value) -> Result<Self::Response> {
        AiState::from_value(&value)
    }
}
