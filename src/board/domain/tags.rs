//! Sanitized tag lists.

use super::BoardDomainError;
use serde::{Deserialize, Serialize};

/// Maximum tag length in characters, measured after trimming.
pub const MAX_TAG_LENGTH: usize = 64;

/// Deduplicated list of trimmed, non-empty tags in first-seen order.
///
/// Deduplication is exact-match: case is preserved and not folded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Tags(Vec<String>);

impl Tags {
    /// Sanitizes raw tags: trims each entry, drops empty entries, and
    /// removes exact duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`BoardDomainError::TagTooLong`] when a trimmed tag exceeds
    /// [`MAX_TAG_LENGTH`] characters.
    pub fn sanitize<I, S>(raw: I) -> Result<Self, BoardDomainError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut tags: Vec<String> = Vec::new();
        for entry in raw {
            let tag = entry.as_ref().trim();
            if tag.is_empty() {
                continue;
            }
            if tag.chars().count() > MAX_TAG_LENGTH {
                return Err(BoardDomainError::TagTooLong {
                    tag: tag.to_owned(),
                    max: MAX_TAG_LENGTH,
                });
            }
            if !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_owned());
            }
        }
        Ok(Self(tags))
    }

    /// Returns the tags as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Iterates tags in stored order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns whether the exact tag is present.
    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|existing| existing == tag)
    }

    /// Returns the number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether there are no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<Vec<String>> for Tags {
    type Error = BoardDomainError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::sanitize(value)
    }
}

impl From<Tags> for Vec<String> {
    fn from(value: Tags) -> Self {
        value.0
    }
}
