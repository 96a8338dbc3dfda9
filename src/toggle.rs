use tracing::debug;

use crate::model::SortIndex;
use crate::query::{check_sort_key, QueryError, QueryState};

/// Result of a sort request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// Already on the requested order; keep the state, cursor and list.
    Unchanged,
    /// New state with the cursor cleared.
    Changed(QueryState),
}

impl Toggle {
    pub fn changed(&self) -> Option<&QueryState> {
        match self {
            Toggle::Changed(state) => Some(state),
            Toggle::Unchanged => None,
        }
    }

    /// State after the request, given the state before it.
    pub fn resolve(self, current: &QueryState) -> QueryState {
        match self {
            Toggle::Changed(state) => state,
            Toggle::Unchanged => current.clone(),
        }
    }
}

impl QueryState {
    /// Apply a user sort request. Rules are checked in order:
    ///
    /// 1. magnitude variant requested while on its signed variant ascending:
    ///    switch to magnitude, descending;
    /// 2. re-requesting a magnitude index: fall back to signed, descending;
    /// 3. `ByHot`: no-op if already hot and descending, else hot descending;
    /// 4. same index and key: flip direction (unset counts as descending);
    ///    anything else: new index and key, descending.
    pub fn toggle(
        &self,
        requested: SortIndex,
        sort_key: Option<&str>,
    ) -> Result<Toggle, QueryError> {
        let sort_key = check_sort_key(requested, sort_key)?;
        let current = self.sort_index();

        let (index, ascending) = if requested.is_absolute()
            && requested.signed() == Some(current)
            && self.ascending() == Some(true)
        {
            (requested, false)
        } else if requested == current && requested.is_absolute() {
            (requested.signed().unwrap_or(requested), false)
        } else if requested == SortIndex::ByHot {
            if current == SortIndex::ByHot && self.ascending() != Some(true) {
                debug!("hot sort already active");
                return Ok(Toggle::Unchanged);
            }
            (SortIndex::ByHot, false)
        } else if requested == current && sort_key.as_deref() == self.sort_key() {
            (requested, !self.ascending().unwrap_or(false))
        } else {
            (requested, false)
        };

        debug!(from = %current, to = %index, ascending, "sort toggled");
        Ok(Toggle::Changed(self.resorted(index, sort_key, Some(ascending))))
    }
}
