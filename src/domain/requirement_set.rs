use std::collections::HashMap;

use borsh::BorshSerialize;
use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use crate::domain::{ErrorId, Watermark};

/// A single extracted normative statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementRecord {
    /// The identifier assigned to the statement.
    pub id: ErrorId,
    /// The fully rendered message. Compared byte for byte, never parsed.
    pub message: String,
}

impl RequirementRecord {
    /// Creates a new record.
    #[must_use]
    pub const fn new(id: ErrorId, message: String) -> Self {
        Self { id, message }
    }
}

/// Returned when inserting an identifier that is already present in a set.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("identifier {} is already assigned", .rejected.id)]
pub struct DuplicateIdError {
    /// The record that was not inserted.
    pub rejected: RequirementRecord,
}

/// An ordered mapping from identifier to message.
///
/// Iteration follows insertion order. Identifiers are unique, and an existing
/// entry is never overwritten.
///
/// Equality is order sensitive: two sets with the same entries in a different
/// order are not equal.
#[derive(Debug, Clone, Default)]
pub struct RequirementSet {
    entries: IndexMap<ErrorId, String>,
}

impl PartialEq for RequirementSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries.iter().eq(other.entries.iter())
    }
}

impl Eq for RequirementSet {}

impl RequirementSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty set with room for `capacity` records.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Builds a set from a map whose keys are already unique.
    pub(crate) const fn from_entries(entries: IndexMap<ErrorId, String>) -> Self {
        Self { entries }
    }

    /// Appends a record to the end of the set.
    ///
    /// # Errors
    ///
    /// Returns the rejected record if its identifier is already present. The
    /// existing entry is left untouched.
    pub fn insert(&mut self, record: RequirementRecord) -> Result<(), DuplicateIdError> {
        if self.entries.contains_key(&record.id) {
            return Err(DuplicateIdError { rejected: record });
        }
        self.entries.insert(record.id, record.message);
        Ok(())
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the message stored under `id`.
    #[must_use]
    pub fn get(&self, id: &ErrorId) -> Option<&str> {
        self.entries.get(id).map(String::as_str)
    }

    /// Returns `true` if `id` is present.
    #[must_use]
    pub fn contains(&self, id: &ErrorId) -> bool {
        self.entries.contains_key(id)
    }

    /// Iterates over `(identifier, message)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&ErrorId, &str)> + '_ {
        self.entries.iter().map(|(id, message)| (id, message.as_str()))
    }

    /// Iterates over the identifiers in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &ErrorId> + '_ {
        self.entries.keys()
    }

    /// Returns the highest identifier suffix in the set, or zero if the set is
    /// empty.
    #[must_use]
    pub fn watermark(&self) -> Watermark {
        self.entries.keys().map(ErrorId::suffix).collect()
    }

    /// Maps each message to the identifier it is stored under.
    ///
    /// When several identifiers carry the same message, the last one in the
    /// set wins.
    #[must_use]
    pub fn message_index(&self) -> HashMap<&str, &ErrorId> {
        self.entries
            .iter()
            .map(|(id, message)| (message.as_str(), id))
            .collect()
    }

    /// Summarises the set: how many records it holds and how many distinct
    /// messages appear under more than one identifier.
    #[must_use]
    pub fn stats(&self) -> Stats {
        let mut occurrences: HashMap<&str, usize> = HashMap::with_capacity(self.len());
        for message in self.entries.values() {
            *occurrences.entry(message.as_str()).or_insert(0) += 1;
        }

        Stats {
            records: self.len(),
            repeated_messages: occurrences.values().filter(|&&count| count > 1).count(),
        }
    }

    /// Calculate the fingerprint of the set.
    ///
    /// The fingerprint is a SHA256 hash of the Borsh-serialized identifiers and
    /// messages, in order, so reordering the set changes the fingerprint.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data).
    #[must_use]
    pub fn fingerprint(&self) -> String {
        #[derive(BorshSerialize)]
        struct FingerprintData<'a> {
            entries: Vec<(String, &'a str)>,
        }

        let data = FingerprintData {
            entries: self
                .iter()
                .map(|(id, message)| (id.to_string(), message))
                .collect(),
        };

        // encode using [borsh](https://borsh.io/)
        let encoded = borsh::to_vec(&data).expect("this should never fail");

        let hash = Sha256::digest(encoded);

        format!("{hash:x}")
    }
}

impl<'a> IntoIterator for &'a RequirementSet {
    type Item = (&'a ErrorId, &'a String);
    type IntoIter = indexmap::map::Iter<'a, ErrorId, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Summary statistics for a [`RequirementSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Stats {
    /// The number of records in the set.
    pub records: usize,
    /// The number of distinct messages that occur more than once.
    pub repeated_messages: usize,
}
