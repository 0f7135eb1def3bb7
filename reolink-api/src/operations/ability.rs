//! GetAbility command and the capability set it returns

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::unwrap_key;
use crate::command::CameraCommand;
use crate::error::Result;

/// Query which features this model and firmware support
#[derive(Debug, Clone)]
pub struct GetAbility {
    pub username: String,
}

impl GetAbility {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }
}

impl CameraCommand for GetAbility {
    type Response = Capabilities;
    const NAME: &'static str = "GetAbility";

    fn params(&self) -> Option<Value> {
        Some(json!({"User": {"userName": self.username}}))
    }

    fn parse_response(value: Value) -> Result<Self::Response> {
        Ok(Capabilities::new(unwrap_key(value, "Ability")))
    }
}

/// Device-reported capability set
///
/// Kept as the raw ability document so callers can pass it through
/// untouched; [`supports`](Self::supports) answers the common question of
/// whether a named ability is present and enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capabilities {
    raw: Value,
}

impl Capabilities {
    pub fn new(raw: Value) -> Self {
        Self { raw }
    }

    /// The ability document as returned by the device
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_raw(self) -> Value {
        self.raw
    }

    /// Number of channels the device reports
    pub fn channel_count(&self) -> Option<u64> {
        self.raw.get("channelNum").and_then(Value::as_u64)
    }

    /// Look up an ability, device-level first, then on `channel`
    pub fn ability(&self, name: &str, channel: u8) -> Option<&Value> {
        self.raw.get(name).or_else(|| {
            self.raw
                .get("abilityChn")
                .and_then(|chn| chn.get(usize::from(channel)))
                .and_then(|chn| chn.get(name))
        })
    }

    /// Whether an ability is present with a non-zero `ver` or `permit`
    pub fn supports(&self, name: &str, channel: u8) -> bool {
        let Some(ability) = self.ability(name, channel) else {
            return false;
        };
        let flag = |key: &str| ability.get(key).and_then(Value::as_i64).unwrap_or(0) != 0;
        match ability {
            Value::Object(_) => flag("ver") || flag("permit"),
            Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
            Value::Bool(b) => *b,
            _ => false,
        }
    }
}
