//! Lane identifiers and the configured lane enumeration.

use super::BoardDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum lane name length in characters, measured after trimming.
pub const MAX_LANE_LENGTH: usize = 100;

/// Name of a status column on the board.
///
/// A `LaneId` is only syntactically validated; membership in the board's
/// configured lanes is checked against a [`LaneSet`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LaneId(String);

impl LaneId {
    /// Creates a validated lane identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidLaneId`] when the value is empty
    /// after trimming, contains whitespace, or exceeds [`MAX_LANE_LENGTH`]
    /// characters.
    pub fn new(value: impl Into<String>) -> Result<Self, BoardDomainError> {
        let raw = value.into();
        let normalized = raw.trim();
        if normalized.is_empty()
            || normalized.chars().any(char::is_whitespace)
            || normalized.chars().count() > MAX_LANE_LENGTH
        {
            return Err(BoardDomainError::InvalidLaneId(raw));
        }
        Ok(Self(normalized.to_owned()))
    }

    /// Returns the lane name as `str`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LaneId {
    type Error = BoardDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LaneId> for String {
    fn from(value: LaneId) -> Self {
        value.0
    }
}

impl AsRef<str> for LaneId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fixed, ordered enumeration of the lanes a board shows.
///
/// The first lane is the default lane for new items and the fallback for
/// items whose stored lane is no longer configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct LaneSet {
    first: LaneId,
    rest: Vec<LaneId>,
}

impl LaneSet {
    /// Creates a lane set from lanes in display order.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::EmptyLaneSet`] when no lane is given and
    /// [`BoardDomainError::DuplicateLane`] when a lane repeats.
    pub fn new(lanes: impl IntoIterator<Item = LaneId>) -> Result<Self, BoardDomainError> {
        let mut iter = lanes.into_iter();
        let first = iter.next().ok_or(BoardDomainError::EmptyLaneSet)?;
        let mut rest: Vec<LaneId> = Vec::new();
        for lane in iter {
            if lane == first || rest.contains(&lane) {
                return Err(BoardDomainError::DuplicateLane(lane.0));
            }
            rest.push(lane);
        }
        Ok(Self { first, rest })
    }

    /// Creates a lane set from raw lane names.
    ///
    /// # Errors
    ///
    /// Returns the first lane identifier or lane set validation failure.
    pub fn from_names<I, S>(names: I) -> Result<Self, BoardDomainError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lanes = names
            .into_iter()
            .map(LaneId::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(lanes)
    }

    /// Returns the default lane (the first configured lane).
    #[must_use]
    pub const fn default_lane(&self) -> &LaneId {
        &self.first
    }

    /// Iterates lanes in configured order.
    pub fn iter(&self) -> impl Iterator<Item = &LaneId> {
        std::iter::once(&self.first).chain(self.rest.iter())
    }

    /// Returns the number of configured lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rest.len() + 1
    }

    /// Always `false`: a lane set holds at least one lane.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Returns whether the lane is configured.
    #[must_use]
    pub fn contains(&self, lane: &LaneId) -> bool {
        self.position(lane).is_some()
    }

    /// Returns the configured position of a lane.
    #[must_use]
    pub fn position(&self, lane: &LaneId) -> Option<usize> {
        self.iter().position(|candidate| candidate == lane)
    }

    /// Resolves a raw lane name to a configured lane.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::InvalidLaneId`] for malformed names and
    /// [`BoardDomainError::UnknownLane`] for names outside the set.
    pub fn resolve(&self, name: &str) -> Result<LaneId, BoardDomainError> {
        let lane = LaneId::new(name)?;
        self.ensure_contains(&lane)?;
        Ok(lane)
    }

    /// Checks that a lane is configured.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::UnknownLane`] when it is not.
    pub fn ensure_contains(&self, lane: &LaneId) -> Result<(), BoardDomainError> {
        if self.contains(lane) {
            Ok(())
        } else {
            Err(BoardDomainError::UnknownLane(lane.to_string()))
        }
    }
}

impl Default for LaneSet {
    fn default() -> Self {
        let lane = |name: &str| LaneId(name.to_owned());
        Self {
            first: lane("pending"),
            rest: vec![lane("in-progress"), lane("review"), lane("done")],
        }
    }
}

impl TryFrom<Vec<String>> for LaneSet {
    type Error = BoardDomainError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::from_names(value)
    }
}

impl From<LaneSet> for Vec<String> {
    fn from(value: LaneSet) -> Self {
        std::iter::once(value.first)
            .chain(value.rest)
            .map(String::from)
            .collect()
    }
}
