//! Board configuration.

use super::{BoardDomainError, LaneSet};
use serde::Deserialize;
use std::time::Duration;

/// Configuration for a board instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Lanes in display order; the first is the default lane.
    pub lanes: LaneSet,
    /// Upper bound on waiting for storage to become ready.
    pub storage_ready_timeout: Duration,
    /// Whether projections include archived items.
    pub include_archived: bool,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            lanes: LaneSet::default(),
            storage_ready_timeout: Duration::from_secs(5),
            include_archived: false,
        }
    }
}

/// JSON shape accepted by [`BoardConfig::from_json`].
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
struct BoardConfigFile {
    lanes: Option<LaneSet>,
    storage_ready_timeout_ms: Option<u64>,
    include_archived: Option<bool>,
}

impl BoardConfig {
    /// Replaces the lane set.
    #[must_use]
    pub fn with_lanes(mut self, lanes: LaneSet) -> Self {
        self.lanes = lanes;
        self
    }

    /// Replaces the storage readiness timeout.
    #[must_use]
    pub fn with_storage_ready_timeout(mut self, timeout: Duration) -> Self {
        self.storage_ready_timeout = timeout;
        self
    }

    /// Sets whether projections include archived items.
    #[must_use]
    pub fn with_include_archived(mut self, include_archived: bool) -> Self {
        self.include_archived = include_archived;
        self
    }

    /// Parses a configuration document; absent keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::MalformedPayload`] when the document is
    /// not valid JSON, has unknown keys, or names an invalid lane set.
    pub fn from_json(document: &str) -> Result<Self, BoardDomainError> {
        let file: BoardConfigFile = serde_json::from_str(document)
            .map_err(|err| BoardDomainError::MalformedPayload(err.to_string()))?;
        let defaults = Self::default();
        Ok(Self {
            lanes: file.lanes.unwrap_or(defaults.lanes),
            storage_ready_timeout: file
                .storage_ready_timeout_ms
                .map_or(defaults.storage_ready_timeout, Duration::from_millis),
            include_archived: file.include_archived.unwrap_or(defaults.include_archived),
        })
    }
}
