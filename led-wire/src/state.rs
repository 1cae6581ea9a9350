//! LED state tags and commands.
//!
//! The device publishes its state as a bare string under the state path
//! and reads commands as a bare string from the command path. Values are
//! never validated locally: whatever the device reports is shown as-is.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Last known LED state as reported by the device.
///
/// `Unknown` is the sentinel shown before the first value arrives.
/// Values outside the known tags are carried verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LedState {
    On,
    Off,
    #[default]
    Unknown,
    Other(String),
}

impl LedState {
    /// Map a value received from the state path.
    ///
    /// Absent and falsy values (`null`, `false`, `0`, `""`) map to `Off`.
    /// Strings are taken verbatim; other values keep their JSON text.
    pub fn from_remote(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) | Some(Value::Bool(false)) => Self::Off,
            Some(Value::String(s)) if s.is_empty() => Self::Off,
            Some(Value::Number(n)) if n.as_f64() == Some(0.0) => Self::Off,
            Some(Value::String(s)) => Self::from(s.clone()),
            Some(other) => Self::Other(other.to_string()),
        }
    }

    /// The tag exactly as stored remotely
    pub fn as_str(&self) -> &str {
        match self {
            Self::On => "on",
            Self::Off => "off",
            Self::Unknown => "unknown",
            Self::Other(raw) => raw,
        }
    }

    /// Label used by the screen (`Current LED State: ON`)
    pub fn display_label(&self) -> String {
        self.as_str().to_uppercase()
    }

    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<String> for LedState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "on" => Self::On,
            "off" => Self::Off,
            "unknown" => Self::Unknown,
            _ => Self::Other(raw),
        }
    }
}

impl From<LedState> for String {
    fn from(state: LedState) -> Self {
        match state {
            LedState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for LedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command written to the command path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    On,
    Off,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    /// JSON value written to the store
    pub fn to_value(self) -> Value {
        Value::String(self.as_str().to_string())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown LED command: {0:?} (expected \"on\" or \"off\")")]
pub struct UnknownCommand(pub String);

impl FromStr for Command {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(UnknownCommand(s.to_string())),
        }
    }
}
