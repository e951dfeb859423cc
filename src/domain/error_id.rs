use std::{fmt, str::FromStr};

use non_empty_string::NonEmptyString;
use serde::{Serialize, Serializer};

/// A validated identifier prefix containing only ASCII letters, digits and
/// underscores, and not ending in an underscore.
///
/// The prefix is every `_`-separated token of an identifier except the final
/// numeric suffix, for example `VALIDATION_ERROR`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdPrefix(NonEmptyString);

impl IdPrefix {
    /// Creates a new `IdPrefix` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPrefixError` if the string is empty, ends with an
    /// underscore, or contains characters other than ASCII letters, digits and
    /// underscores.
    pub fn new(s: String) -> Result<Self, InvalidPrefixError> {
        if s.ends_with('_') || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidPrefixError(s));
        }

        NonEmptyString::new(s)
            .map(Self)
            .map_err(InvalidPrefixError)
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Default for IdPrefix {
    fn default() -> Self {
        // `DEFAULT_PREFIX` is a non-empty run of uppercase letters and underscores
        Self::new(DEFAULT_PREFIX.to_string()).expect("the default prefix is valid")
    }
}

/// The prefix used for identifiers when none is configured.
pub const DEFAULT_PREFIX: &str = "VALIDATION_ERROR";

impl fmt::Display for IdPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IdPrefix {
    type Err = InvalidPrefixError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Error returned when a string is not a valid identifier prefix.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "Invalid identifier prefix '{0}': must be non-empty, contain only ASCII letters, digits and \
     underscores, and not end with an underscore"
)]
pub struct InvalidPrefixError(String);

/// A validation error identifier.
///
/// Format: `{PREFIX}_{SUFFIX}`, where:
/// - `PREFIX` is one or more `_`-separated tokens (e.g. `VALIDATION_ERROR`)
/// - `SUFFIX` is a non-negative integer without leading zeros (e.g. `0`, `1234`)
///
/// Only the suffix carries meaning. It orders identifiers and decides whether
/// an identifier is new or already known.
///
/// Examples: `VALIDATION_ERROR_0`, `VALIDATION_ERROR_1_2_15`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ErrorId {
    prefix: IdPrefix,
    suffix: u64,
}

impl ErrorId {
    /// Create an identifier from a pre-validated prefix.
    #[must_use]
    pub const fn new(prefix: IdPrefix, suffix: u64) -> Self {
        Self { prefix, suffix }
    }

    /// Returns the prefix (every token except the numeric suffix).
    #[must_use]
    pub const fn prefix(&self) -> &IdPrefix {
        &self.prefix
    }

    /// Returns the numeric suffix.
    #[must_use]
    pub const fn suffix(&self) -> u64 {
        self.suffix
    }

    /// Returns a copy of this identifier with the numeric suffix replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use vuid::ErrorId;
    ///
    /// let id: ErrorId = "VALIDATION_ERROR_3".parse().unwrap();
    /// assert_eq!(id.with_suffix(42).to_string(), "VALIDATION_ERROR_42");
    /// ```
    #[must_use]
    pub fn with_suffix(&self, suffix: u64) -> Self {
        Self::new(self.prefix.clone(), suffix)
    }
}

impl fmt::Display for ErrorId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.prefix, self.suffix)
    }
}

impl Serialize for ErrorId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Errors that can occur during identifier parsing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    /// Malformed structure (no separator, empty segments).
    #[error("Invalid identifier format: {0}")]
    Syntax(String),

    /// The final token is not a non-negative integer in canonical form.
    #[error(
        "Invalid suffix in identifier '{0}': expected a non-negative integer without leading \
         zeros, got '{1}'"
    )]
    Suffix(String, String),

    /// The prefix contains invalid characters.
    #[error(transparent)]
    Prefix(#[from] InvalidPrefixError),
}

impl FromStr for ErrorId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Some((prefix, suffix)) = s.rsplit_once('_') else {
            return Err(Error::Syntax(s.to_string()));
        };

        if prefix.is_empty() || suffix.is_empty() {
            return Err(Error::Syntax(s.to_string()));
        }

        // `u64::from_str` accepts a leading '+' and leading zeros, neither of
        // which survives being written back out
        if !suffix.bytes().all(|b| b.is_ascii_digit())
            || (suffix.len() > 1 && suffix.starts_with('0'))
        {
            return Err(Error::Suffix(s.to_string(), suffix.to_string()));
        }
        let suffix = suffix
            .parse::<u64>()
            .map_err(|_| Error::Suffix(s.to_string(), suffix.to_string()))?;

        let prefix = IdPrefix::new(prefix.to_string())?;

        Ok(Self::new(prefix, suffix))
    }
}
