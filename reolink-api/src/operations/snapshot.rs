//! Snapshot stream selection

use std::fmt;
use std::str::FromStr;

/// Stream a snapshot is captured from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapStream {
    #[default]
    Main,
    Sub,
}

impl SnapStream {
    /// Value of the `rs` query parameter, if the stream needs one
    pub fn rs_param(self, channel: u8) -> Option<String> {
        match self {
            SnapStream::Main => None,
            SnapStream::Sub => Some(format!("{}0100", channel)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SnapStream::Main => "main",
            SnapStream::Sub => "sub",
        }
    }
}

impl fmt::Display for SnapStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapStream {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "main" => Ok(SnapStream::Main),
            "sub" => Ok(SnapStream::Sub),
            other => Err(format!("unknown stream '{}', expected 'main' or 'sub'", other)),
        }
    }
}
