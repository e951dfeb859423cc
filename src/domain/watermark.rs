//! Watermarks and identifier minting.

use std::fmt;

/// The highest identifier suffix observed so far.
///
/// A watermark only ever moves up: [`Watermark::advance`] ignores values below
/// the current mark.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(u64);

impl Watermark {
    /// Creates a watermark at the given suffix.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Returns the highest suffix observed.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Raises the watermark to `suffix` if it is higher than the current mark.
    pub const fn advance(&mut self, suffix: u64) {
        if suffix > self.0 {
            self.0 = suffix;
        }
    }

    /// Returns a minter that hands out suffixes strictly above this watermark.
    #[must_use]
    pub const fn minter(self) -> IdMinter {
        IdMinter::new(self)
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromIterator<u64> for Watermark {
    fn from_iter<I: IntoIterator<Item = u64>>(iter: I) -> Self {
        let mut watermark = Self::default();
        for suffix in iter {
            watermark.advance(suffix);
        }
        watermark
    }
}

/// A counter handing out fresh identifier suffixes.
///
/// Each reconciliation run owns its own minter, so runs never share state.
/// Every suffix it hands out is strictly above the seed watermark and above
/// every suffix handed out before it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdMinter {
    /// `None` once the suffix space is exhausted.
    next: Option<u64>,
    watermark: Watermark,
}

impl IdMinter {
    /// Creates a minter whose first suffix is `watermark + 1`.
    #[must_use]
    pub const fn new(watermark: Watermark) -> Self {
        Self {
            next: watermark.value().checked_add(1),
            watermark,
        }
    }

    /// Returns the next unused suffix and advances the counter, or `None` if
    /// no suffix above the watermark is left.
    pub const fn mint(&mut self) -> Option<u64> {
        let Some(suffix) = self.next else {
            return None;
        };
        self.next = suffix.checked_add(1);
        self.watermark.advance(suffix);
        Some(suffix)
    }

    /// Returns the highest suffix known to this minter, including the seed
    /// watermark.
    #[must_use]
    pub const fn watermark(&self) -> Watermark {
        self.watermark
    }
}
