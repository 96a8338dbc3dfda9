//! The query state a list view holds: sort order, direction, page size and
//! the pagination cursor.
//!
//! `QueryState` is an immutable value. Transitions (see `toggle`) and cursor
//! advances return a new value; the holder replaces its reference.
use thiserror::Error;

use crate::cursor::Cursor;
use crate::fragment::is_sort_alias;
use crate::model::SortIndex;

pub const DEFAULT_PAGE_SIZE: u32 = 25;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0} requires a sort key")]
    MissingSortKey(SortIndex),
    #[error("{0} does not take a sort key")]
    UnexpectedSortKey(SortIndex),
    #[error("page size must be > 0")]
    ZeroPageSize,
    #[error("sort key '{0}' is reserved as a sort alias")]
    ReservedSortKey(String),
}

/// The part of the state that scopes a cursor and the has-more flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SortTriple {
    pub sort_index: SortIndex,
    pub sort_key: Option<String>,
    pub ascending: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    sort_index: SortIndex,
    sort_key: Option<String>,
    ascending: Option<bool>,
    page_size: u32,
    cursor: Option<Cursor>,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            sort_index: SortIndex::ByDate,
            sort_key: None,
            ascending: None,
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
        }
    }
}

impl QueryState {
    pub fn new(sort_index: SortIndex, sort_key: Option<&str>) -> Result<Self, QueryError> {
        let sort_key = check_sort_key(sort_index, sort_key)?;
        Ok(Self {
            sort_index,
            sort_key,
            ..Self::default()
        })
    }

    pub fn with_ascending(self, ascending: Option<bool>) -> Self {
        Self { ascending, ..self }
    }

    /// Fix the page size for a new view instance.
    pub fn with_page_size(self, page_size: u32) -> Result<Self, QueryError> {
        if page_size == 0 {
            return Err(QueryError::ZeroPageSize);
        }
        Ok(Self { page_size, ..self })
    }

    pub fn with_cursor(&self, cursor: Cursor) -> Self {
        Self {
            cursor: Some(cursor),
            ..self.clone()
        }
    }

    pub fn without_cursor(&self) -> Self {
        Self {
            cursor: None,
            ..self.clone()
        }
    }

    /// Same page size, new sort triple, no cursor.
    pub(crate) fn resorted(
        &self,
        sort_index: SortIndex,
        sort_key: Option<String>,
        ascending: Option<bool>,
    ) -> Self {
        Self {
            sort_index,
            sort_key,
            ascending,
            page_size: self.page_size,
            cursor: None,
        }
    }

    pub fn sort_index(&self) -> SortIndex {
        self.sort_index
    }

    pub fn sort_key(&self) -> Option<&str> {
        self.sort_key.as_deref()
    }

    pub fn ascending(&self) -> Option<bool> {
        self.ascending
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    pub fn triple(&self) -> SortTriple {
        SortTriple {
            sort_index: self.sort_index,
            sort_key: self.sort_key.clone(),
            ascending: self.ascending,
        }
    }
}

/// Enforce "sort key present iff tracked-issue sort".
pub(crate) fn check_sort_key(
    sort_index: SortIndex,
    sort_key: Option<&str>,
) -> Result<Option<String>, QueryError> {
    let sort_key = sort_key.map(str::trim).filter(|k| !k.is_empty());
    match (sort_index.requires_sort_key(), sort_key) {
        (true, Some(key)) if is_sort_alias(key) => Err(QueryError::ReservedSortKey(key.to_string())),
        (true, Some(key)) => Ok(Some(key.to_string())),
        (true, None) => Err(QueryError::MissingSortKey(sort_index)),
        (false, Some(_)) => Err(QueryError::UnexpectedSortKey(sort_index)),
        (false, None) => Ok(None),
    }
}
