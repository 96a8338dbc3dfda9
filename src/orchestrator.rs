//! Per-view fetch orchestration for infinite-scroll lists.
//!
//! One logical fetch is current at a time. Scroll-triggered requests are
//! refused while it is in flight; a sort change supersedes it by bumping the
//! sequence counter, and the superseded response is discarded on arrival.
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::cursor::{build_cursor, build_offset_cursor, Cursor, CursorError};
use crate::model::{Interaction, PageEntity, SortIndex};
use crate::query::{QueryError, QueryState};
use crate::service::{InteractionService, ListService, Page, PageRequest};
use crate::toggle::Toggle;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("page fetch failed: {0:#}")]
    Service(anyhow::Error),
    #[error("page applied but next cursor unavailable: {0}")]
    Cursor(#[from] CursorError),
}

/// Handle for one issued fetch; hand it back to [`ListFetcher::complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    seq: u64,
    replace: bool,
    request: PageRequest,
}

impl FetchTicket {
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    pub fn request(&self) -> &PageRequest {
        &self.request
    }

    /// First page of the current order (replaces the list).
    pub fn is_first_page(&self) -> bool {
        self.replace
    }
}

/// How the next page's cursor is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Paging {
    /// Last entity's id and sort field value.
    #[default]
    Keyed,
    /// Position of the last listed item.
    Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Replaced(usize),
    Appended(usize),
    /// Page started with an already-listed entity and was dropped. The
    /// cursor does not move, so a full duplicate page is requested again by
    /// the next fetch.
    Duplicate,
    /// Superseded by a newer fetch and discarded.
    Stale,
}

#[derive(Debug)]
pub struct ListFetcher<E> {
    state: QueryState,
    paging: Paging,
    items: Vec<E>,
    has_more: bool,
    in_flight: Option<u64>,
    sequence: u64,
}

impl<E: PageEntity> ListFetcher<E> {
    pub fn new(state: QueryState) -> Self {
        Self::with_paging(state, Paging::Keyed)
    }

    pub fn with_paging(state: QueryState, paging: Paging) -> Self {
        Self {
            state,
            paging,
            items: Vec::new(),
            has_more: true,
            in_flight: None,
            sequence: 0,
        }
    }

    pub fn state(&self) -> &QueryState {
        &self.state
    }

    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Next-page request for the current order. `None` while a fetch is in
    /// flight or once the order is exhausted.
    pub fn begin_fetch(&mut self) -> Option<FetchTicket> {
        if let Some(seq) = self.in_flight {
            debug!(seq, "fetch already in flight");
            return None;
        }
        if !self.has_more {
            return None;
        }
        let replace = self.state.cursor().is_none();
        Some(self.issue(replace))
    }

    /// Apply a user sort request. On change the list, cursor and has-more
    /// flag reset and a first-page fetch is issued, superseding any fetch in
    /// flight.
    pub fn apply_sort(
        &mut self,
        index: SortIndex,
        sort_key: Option<&str>,
    ) -> Result<Option<FetchTicket>, QueryError> {
        match self.state.toggle(index, sort_key)? {
            Toggle::Unchanged => Ok(None),
            Toggle::Changed(next) => Ok(Some(self.reset(next))),
        }
    }

    /// Replace the order outright (e.g. from a decoded fragment).
    pub fn reset(&mut self, state: QueryState) -> FetchTicket {
        self.state = state.without_cursor();
        self.items.clear();
        self.has_more = true;
        self.issue(true)
    }

    fn issue(&mut self, replace: bool) -> FetchTicket {
        self.sequence += 1;
        self.in_flight = Some(self.sequence);
        debug!(seq = self.sequence, replace, index = %self.state.sort_index(), "fetch issued");
        FetchTicket {
            seq: self.sequence,
            replace,
            request: PageRequest::from_state(&self.state),
        }
    }

    /// Fold a fetch result into the view.
    ///
    /// Only the ticket currently in flight is accepted; superseded or
    /// already-completed tickets are `Stale`. Failures leave the list as it
    /// was and clear the in-flight flag so the user can retry.
    pub fn complete(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Vec<E>>,
    ) -> Result<FetchOutcome, FetchError> {
        self.complete_page(ticket, result.map(Page::from))
    }

    /// [`complete`](Self::complete) for services that report their own
    /// has-more flag.
    pub fn complete_page(
        &mut self,
        ticket: FetchTicket,
        result: anyhow::Result<Page<E>>,
    ) -> Result<FetchOutcome, FetchError> {
        if self.in_flight != Some(ticket.seq) {
            debug!(seq = ticket.seq, current = self.sequence, "discarding stale page");
            return Ok(FetchOutcome::Stale);
        }
        self.in_flight = None;

        let Page { items: page, has_more } = match result {
            Ok(page) => page,
            Err(err) => {
                warn!(?err, seq = ticket.seq, "page fetch failed");
                return Err(FetchError::Service(err));
            }
        };

        let count = page.len();
        let more = has_more.unwrap_or(count >= self.state.page_size() as usize);
        if !more {
            self.has_more = false;
        }

        let outcome = if ticket.replace {
            self.items = page;
            FetchOutcome::Replaced(count)
        } else if let Some(first) = page.first() {
            if self.items.iter().any(|item| item.id() == first.id()) {
                debug!(
                    id = first.id(),
                    has_more = self.has_more,
                    "page repeats a listed entity; cursor unchanged"
                );
                return Ok(FetchOutcome::Duplicate);
            }
            self.items.extend(page);
            FetchOutcome::Appended(count)
        } else {
            FetchOutcome::Appended(0)
        };

        if self.has_more {
            match self.next_cursor() {
                Ok(Some(cursor)) => self.state = self.state.with_cursor(cursor),
                Ok(None) => {}
                Err(err) => {
                    self.has_more = false;
                    return Err(FetchError::Cursor(err));
                }
            }
        }

        info!(
            ?outcome,
            total = self.items.len(),
            has_more = self.has_more,
            "page applied"
        );
        Ok(outcome)
    }

    fn next_cursor(&self) -> Result<Option<Cursor>, CursorError> {
        match self.paging {
            Paging::Offset => Ok(build_offset_cursor(self.items.len())),
            Paging::Keyed => self
                .items
                .last()
                .map(|last| build_cursor(&self.state, last))
                .transpose(),
        }
    }

    /// Issue, await and fold the next page. `Ok(None)` when no fetch was
    /// started.
    #[instrument(skip_all)]
    pub async fn fetch_next(
        &mut self,
        service: &dyn ListService<E>,
    ) -> Result<Option<FetchOutcome>, FetchError> {
        let Some(ticket) = self.begin_fetch() else {
            return Ok(None);
        };
        let result = service.fetch_page(ticket.request()).await;
        self.complete(ticket, result).map(Some)
    }
}

impl ListFetcher<Interaction> {
    /// Detail-page interaction list of one legislator.
    pub fn interactions(state: QueryState) -> Self {
        Self::with_paging(state, Paging::Offset)
    }

    #[instrument(skip_all, fields(legislator_id = %legislator_id))]
    pub async fn fetch_next_interactions(
        &mut self,
        service: &dyn InteractionService,
        legislator_id: &str,
    ) -> Result<Option<FetchOutcome>, FetchError> {
        let Some(ticket) = self.begin_fetch() else {
            return Ok(None);
        };
        let result = service
            .fetch_interactions(legislator_id, ticket.request())
            .await;
        self.complete_page(ticket, result).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Bill;
    use chrono::NaiveDate;

    fn bill(n: u32) -> Bill {
        Bill {
            id: format!("BIL/us/congress/118/hr/{n}"),
            name: None,
            introduced_date: NaiveDate::from_ymd_opt(2023, 1, 1 + n % 28),
            impact: Some(n as i64),
            interpretation: None,
        }
    }

    fn fetcher(page_size: u32) -> ListFetcher<Bill> {
        let state = QueryState::new(SortIndex::ByDate, None)
            .unwrap()
            .with_page_size(page_size)
            .unwrap();
        ListFetcher::new(state)
    }

    #[test]
    fn scroll_requests_are_refused_while_in_flight() {
        let mut f = fetcher(2);
        let ticket = f.begin_fetch().unwrap();
        assert!(ticket.is_first_page());
        assert!(f.is_fetching());
        assert!(f.begin_fetch().is_none());
        f.complete(ticket, Ok(vec![bill(1), bill(2)])).unwrap();
        assert!(!f.is_fetching());
        let next = f.begin_fetch().unwrap();
        assert!(!next.is_first_page());
        assert_eq!(
            next.request().cursor.as_deref(),
            Some("BIL/us/congress/118/hr/2~`~2023-01-03")
        );
    }

    #[test]
    fn short_page_ends_the_order_until_it_changes() {
        let mut f = fetcher(3);
        let ticket = f.begin_fetch().unwrap();
        f.complete(ticket, Ok(vec![bill(1)])).unwrap();
        assert!(!f.has_more());
        assert!(f.begin_fetch().is_none());
        assert!(f.state().cursor().is_none());

        let ticket = f.apply_sort(SortIndex::ByImpact, None).unwrap().unwrap();
        assert!(f.has_more());
        assert!(f.items().is_empty());
        assert_eq!(ticket.request().sort_index, SortIndex::ByImpact);
    }

    #[test]
    fn failure_keeps_list_and_allows_retry() {
        let mut f = fetcher(1);
        let ticket = f.begin_fetch().unwrap();
        f.complete(ticket, Ok(vec![bill(1)])).unwrap();
        let ticket = f.begin_fetch().unwrap();
        let err = f.complete(ticket, Err(anyhow::anyhow!("boom"))).unwrap_err();
        assert!(matches!(err, FetchError::Service(_)));
        assert_eq!(f.items().len(), 1);
        assert!(!f.is_fetching());
        assert!(f.begin_fetch().is_some());
    }

    #[test]
    fn hot_sort_cannot_page_past_first_page() {
        let mut f = fetcher(1);
        let ticket = f.apply_sort(SortIndex::ByHot, None).unwrap().unwrap();
        let err = f.complete(ticket, Ok(vec![bill(1)])).unwrap_err();
        assert!(matches!(
            err,
            FetchError::Cursor(CursorError::UnsupportedSortIndex(SortIndex::ByHot))
        ));
        assert_eq!(f.items().len(), 1);
        assert!(!f.has_more());
    }

    #[test]
    fn ticket_cannot_be_completed_twice() {
        let mut f = fetcher(1);
        let ticket = f.begin_fetch().unwrap();
        let replay = ticket.clone();
        assert_eq!(f.complete(ticket, Ok(vec![bill(1)])).unwrap(), FetchOutcome::Replaced(1));
        assert_eq!(f.complete(replay, Ok(vec![bill(9)])).unwrap(), FetchOutcome::Stale);
        assert_eq!(f.items()[0].id, "BIL/us/congress/118/hr/1");
        assert!(f.begin_fetch().is_some());
    }

    #[test]
    fn short_duplicate_page_still_ends_the_order() {
        let mut f = fetcher(2);
        let ticket = f.begin_fetch().unwrap();
        f.complete(ticket, Ok(vec![bill(1), bill(2)])).unwrap();
        let cursor = f.state().cursor().cloned();
        let ticket = f.begin_fetch().unwrap();
        assert_eq!(f.complete(ticket, Ok(vec![bill(2)])).unwrap(), FetchOutcome::Duplicate);
        assert!(!f.has_more());
        assert_eq!(f.state().cursor().cloned(), cursor);
    }

    #[test]
    fn offset_paging_follows_reported_has_more() {
        let mut f = ListFetcher::with_paging(
            QueryState::default().with_page_size(2).unwrap(),
            Paging::Offset,
        );
        let ticket = f.begin_fetch().unwrap();
        let page = Page {
            items: vec![bill(1)],
            has_more: Some(true),
        };
        assert_eq!(f.complete_page(ticket, Ok(page)).unwrap(), FetchOutcome::Replaced(1));
        assert!(f.has_more());
        assert_eq!(f.state().cursor().map(Cursor::as_str), Some("0"));

        let ticket = f.begin_fetch().unwrap();
        assert_eq!(ticket.request().cursor.as_deref(), Some("0"));
        let page = Page {
            items: vec![bill(2), bill(3)],
            has_more: Some(false),
        };
        assert_eq!(f.complete_page(ticket, Ok(page)).unwrap(), FetchOutcome::Appended(2));
        assert!(!f.has_more());
        assert!(f.begin_fetch().is_none());
    }

    #[test]
    fn offset_paging_works_for_hot_sort() {
        let state = QueryState::new(SortIndex::ByHot, None)
            .unwrap()
            .with_page_size(1)
            .unwrap();
        let mut f = ListFetcher::with_paging(state, Paging::Offset);
        let ticket = f.begin_fetch().unwrap();
        f.complete(ticket, Ok(vec![bill(1)])).unwrap();
        assert!(f.has_more());
        assert_eq!(f.state().cursor().map(Cursor::as_str), Some("0"));
    }

    #[test]
    fn repeated_hot_request_issues_nothing() {
        let mut f = fetcher(1);
        f.apply_sort(SortIndex::ByHot, None).unwrap().unwrap();
        assert!(f.apply_sort(SortIndex::ByHot, None).unwrap().is_none());
    }
}
