//! GetDevInfo command

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::unwrap_key;
use crate::command::CameraCommand;
use crate::error::{ApiError, Result};

/// Query model, firmware and identity information
#[derive(Debug, Clone, Copy, Default)]
pub struct GetDevInfo;

/// Device identity as reported by `GetDevInfo`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firm_ver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_ver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_num: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exact_type: Option<String>,
    /// Every other field the firmware reports
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CameraCommand for GetDevInfo {
    type Response = DeviceInfo;
    const NAME: &'static str = "GetDevInfo";

    fn parse_response(value: Value) -> Result<Self::Response> {
        serde_json::from_value(unwrap_key(value, "DevInfo"))
            .map_err(|e| ApiError::unparseable(Self::NAME, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_dev_info() {
        let value = json!({
            "DevInfo": {
                "B485": 0,
                "channelNum": 1,
                "exactType": "IPC",
                "firmVer": "v3.1.0.2347_24082800_v1.0.0.93",
                "hardVer": "IPC_523B18D8MP_V2",
                "model": "Argus 4 Pro",
                "name": "Front Door",
                "serial": "00000000000000",
                "wifi": 1
            }
        });

        let info = GetDevInfo::parse_response(value).unwrap();
        assert_eq!(info.model.as_deref(), Some("Argus 4 Pro"));
        assert_eq!(info.name.as_deref(), Some("Front Door"));
        assert_eq!(info.channel_num, Some(1));
        assert_eq!(info.exact_type.as_deref(), Some("IPC"));
        assert_eq!(info.extra.get("wifi"), Some(&json!(1)));
    }

    #[test]
    fn test_parse_dev_info_unwrapped() {
        let info = GetDevInfo::parse_response(json!({"model": "RLC-810A"})).unwrap();
        assert_eq!(info.model.as_deref(), Some("RLC-810A"));
        assert!(info.firm_ver.is_none());
    }
}
