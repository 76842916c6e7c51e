//! Cursor pagination for story feeds.
//!
//! A page is addressed by an optional pivot (a public story id) and a
//! direction. `before=<id>` selects rows with `id > pivot`, `after=<id>`
//! selects rows with `id < pivot`. Callers already depend on that mapping.

use thiserror::Error;

use thebestory_common::identifier::{self, IdentifierError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("only one of `before` and `after` may be given")]
    BothPivots,

    #[error("invalid pivot: {0}")]
    InvalidPivot(#[from] IdentifierError),

    #[error("limit must be an integer between {min} and {max}")]
    InvalidLimit { min: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Before,
    After,
}

impl Direction {
    /// Comparison applied as `id <op> pivot`.
    pub fn comparator(&self) -> &'static str {
        match self {
            Direction::Before => ">",
            Direction::After => "<",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub pivot: Option<i64>,
    pub limit: i64,
    pub direction: Direction,
}

/// Page size bounds, built once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub min_limit: i64,
    pub max_limit: i64,
    pub default_limit: i64,
}

impl Default for Listing {
    fn default() -> Self {
        Self::new(1, 100, 25)
    }
}

impl Listing {
    pub const fn new(min_limit: i64, max_limit: i64, default_limit: i64) -> Self {
        Self { min_limit, max_limit, default_limit }
    }

    pub fn validate(
        &self,
        before: Option<&str>,
        after: Option<&str>,
        limit: Option<&str>,
    ) -> Result<Page, ListingError> {
        let (pivot, direction) = match (before, after) {
            (Some(_), Some(_)) => return Err(ListingError::BothPivots),
            (Some(before), None) => (Some(identifier::decode_key(before)?), Direction::Before),
            (None, Some(after)) => (Some(identifier::decode_key(after)?), Direction::After),
            (None, None) => (None, Direction::default()),
        };

        Ok(Page {
            pivot,
            limit: self.validate_limit(limit)?,
            direction,
        })
    }

    pub fn validate_limit(&self, limit: Option<&str>) -> Result<i64, ListingError> {
        let Some(raw) = limit else {
            return Ok(self.default_limit);
        };

        raw.parse::<i64>()
            .ok()
            .filter(|limit| (self.min_limit..=self.max_limit).contains(limit))
            .ok_or(ListingError::InvalidLimit {
                min: self.min_limit,
                max: self.max_limit,
            })
    }
}
