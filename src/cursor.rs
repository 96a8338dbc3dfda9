//! Exclusive-start-key construction for the next page.
//!
//! A cursor is `<entity id><separator><sort field value>`, where the sort
//! field follows the active sort index. The value is never guessed: a missing
//! field or an index without a cursor field is an error.
use std::fmt;
use thiserror::Error;

use crate::model::{PageEntity, SortIndex};
use crate::query::QueryState;

/// Cannot occur in entity ids, integers or ISO dates.
pub const CURSOR_SEPARATOR: &str = "~`~";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("sort index {0} has no cursor field")]
    UnsupportedSortIndex(SortIndex),
    #[error("entity '{id}' has no {field} to page by")]
    MissingField { id: String, field: &'static str },
    #[error("entity id '{0}' contains the cursor separator")]
    SeparatorInId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor(String);

impl Cursor {
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `(entity_id, sort_value)`, or `None` for a cursor without a separator.
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once(CURSOR_SEPARATOR)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_cursor<E: PageEntity + ?Sized>(
    state: &QueryState,
    last: &E,
) -> Result<Cursor, CursorError> {
    let id = last.id();
    if id.contains(CURSOR_SEPARATOR) {
        return Err(CursorError::SeparatorInId(id.to_string()));
    }
    let missing = |field: &'static str| CursorError::MissingField {
        id: id.to_string(),
        field,
    };

    let value = match state.sort_index() {
        SortIndex::ByDate => last
            .date_of_record()
            .ok_or_else(|| missing("date of record"))?
            .format("%Y-%m-%d")
            .to_string(),
        SortIndex::ByRating => last.rating(None).ok_or_else(|| missing("rating"))?.to_string(),
        SortIndex::ByTrackedIssue => last
            .rating(state.sort_key())
            .ok_or_else(|| missing("issue rating"))?
            .to_string(),
        SortIndex::ByRatingAbs => last
            .rating(None)
            .ok_or_else(|| missing("rating"))?
            .unsigned_abs()
            .to_string(),
        SortIndex::ByImpact => last.impact().ok_or_else(|| missing("impact"))?.to_string(),
        SortIndex::ByImpactAbs => last
            .impact()
            .ok_or_else(|| missing("impact"))?
            .unsigned_abs()
            .to_string(),
        SortIndex::ByLocation => last.location().ok_or_else(|| missing("location"))?.to_string(),
        other @ SortIndex::ByHot => return Err(CursorError::UnsupportedSortIndex(other)),
    };

    Ok(Cursor(format!("{}{}{}", id, CURSOR_SEPARATOR, value)))
}

/// Offset cursor for lists the service pages by position: the index of the
/// last listed item. `None` before anything is listed.
pub fn build_offset_cursor(listed: usize) -> Option<Cursor> {
    listed.checked_sub(1).map(|last| Cursor(last.to_string()))
}
