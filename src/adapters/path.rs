//! Store paths
//!
//! Realtime Database keys cannot be empty or contain `.`, `$`, `#`, `[`
//! or `]`. Paths are kept without leading/trailing slashes.

use std::fmt;
use std::str::FromStr;

use crate::error::StoreError;

const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath(String);

impl StorePath {
    pub fn new(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim().trim_matches('/');
        if trimmed.is_empty() {
            return Err(StoreError::InvalidPath {
                path: raw.to_string(),
                reason: "path is empty",
            });
        }
        for segment in trimmed.split('/') {
            if segment.is_empty() {
                return Err(StoreError::InvalidPath {
                    path: raw.to_string(),
                    reason: "empty path segment",
                });
            }
            if segment.contains(FORBIDDEN) {
                return Err(StoreError::InvalidPath {
                    path: raw.to_string(),
                    reason: "segment contains one of . $ # [ ]",
                });
            }
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Append a relative child path
    pub fn join(&self, child: &str) -> Result<Self, StoreError> {
        Self::new(&format!("{}/{}", self.0, child.trim_matches('/')))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The two locations the screen talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedPaths {
    /// Write-only: commands for the device
    pub command: StorePath,
    /// Read-only: state reported by the device
    pub state: StorePath,
}

impl LedPaths {
    pub fn under(prefix: &str, command: &str, state: &str) -> Result<Self, StoreError> {
        let prefix = StorePath::new(prefix)?;
        Ok(Self {
            command: prefix.join(command)?,
            state: prefix.join(state)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_is_normalised() {
        let path = StorePath::new("/artifacts/app/led/").unwrap();
        assert_eq!(path.as_str(), "artifacts/app/led");
        assert_eq!(path.segments().count(), 3);
    }

    #[test]
    fn test_path_rejects_bad_segments() {
        assert!(StorePath::new("").is_err());
        assert!(StorePath::new("/").is_err());
        assert!(StorePath::new("a//b").is_err());
        assert!(StorePath::new("a/b.c").is_err());
        assert!(StorePath::new("a/$b").is_err());
        assert!(StorePath::new("a/[0]").is_err());
    }

    #[test]
    fn test_led_paths_share_prefix() {
        let paths = LedPaths::under(
            "artifacts/default-app-id/public/data/led_rtdb_control",
            "command",
            "currentLedState",
        )
        .unwrap();
        assert_eq!(
            paths.command.as_str(),
            "artifacts/default-app-id/public/data/led_rtdb_control/command"
        );
        assert_eq!(
            paths.state.as_str(),
            "artifacts/default-app-id/public/data/led_rtdb_control/currentLedState"
        );
    }
}
