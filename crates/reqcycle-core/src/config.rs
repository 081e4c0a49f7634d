//! Registry configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How request ids are generated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// Random UUID v4 strings.
    #[default]
    Uuid,
    /// `<salt>-<counter>`: a random per-process salt plus a monotonic counter.
    Sequential,
}

impl FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uuid" => Ok(Self::Uuid),
            "sequential" | "seq" => Ok(Self::Sequential),
            other => Err(format!("unknown id strategy: {other} (expected uuid or sequential)")),
        }
    }
}

impl fmt::Display for IdStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uuid => f.write_str("uuid"),
            Self::Sequential => f.write_str("sequential"),
        }
    }
}

/// Settings for a [`RequestRegistry`](crate::RequestRegistry).
///
/// Deserializable so hosts can embed it in their own configuration files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistryConfig {
    pub id_strategy: IdStrategy,
    /// Log at `warn` (instead of `debug`) when a start replaces a request
    /// that was never ended.
    pub warn_on_replace: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::Uuid,
            warn_on_replace: true,
        }
    }
}

impl RegistryConfig {
    pub fn with_id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    pub fn with_warn_on_replace(mut self, warn: bool) -> Self {
        self.warn_on_replace = warn;
        self
    }
}
