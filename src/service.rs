use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::config::Config;
use crate::model::{Bill, EntityKind, Interaction, Legislator, SortIndex};
use crate::query::QueryState;
use crate::resolver::JurisdictionContext;

/// One page request as sent to the data service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub sort_index: SortIndex,
    pub sort_key: Option<String>,
    pub ascending: Option<bool>,
    pub page_size: u32,
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn from_state(state: &QueryState) -> Self {
        Self {
            sort_index: state.sort_index(),
            sort_key: state.sort_key().map(str::to_string),
            ascending: state.ascending(),
            page_size: state.page_size(),
            cursor: state.cursor().map(|c| c.as_str().to_string()),
        }
    }
}

/// A fetched page. `has_more` is the service's own continuation flag, when
/// it reports one; otherwise a short page ends the order.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<E> {
    pub items: Vec<E>,
    pub has_more: Option<bool>,
}

impl<E> From<Vec<E>> for Page<E> {
    fn from(items: Vec<E>) -> Self {
        Self {
            items,
            has_more: None,
        }
    }
}

/// Remote source of ordered entity pages. A page shorter than the requested
/// size means there is nothing further.
#[async_trait]
pub trait ListService<E>: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<E>>;
}

/// A legislator's interaction list, paged by offset with a server-side
/// has-more flag.
#[async_trait]
pub trait InteractionService: Send + Sync {
    async fn fetch_interactions(
        &self,
        legislator_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Interaction>>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InteractionPage {
    #[serde(default)]
    data: Vec<Vec<Interaction>>,
    #[serde(default)]
    has_more_data: bool,
}

#[derive(Clone)]
pub struct HttpListService {
    http: Client,
    base_url: Url,
    year: i32,
    namespace: String,
}

impl fmt::Debug for HttpListService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpListService")
            .field("base_url", &self.base_url)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl HttpListService {
    pub fn new(base_url: Url, user_agent: &str, ctx: &JurisdictionContext) -> Result<Self> {
        let http = Client::builder()
            .user_agent(user_agent)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            http,
            base_url,
            year: ctx.current_year,
            namespace: ctx.namespace(),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.resolved_base_url()).context("invalid api.base_url")?;
        let ctx = cfg.context()?;
        Self::new(base_url, &cfg.api.user_agent, &ctx)
    }

    fn endpoint(kind: EntityKind) -> Result<&'static str> {
        match kind {
            EntityKind::Legislator => Ok("getLegislators"),
            EntityKind::Bill => Ok("getBills"),
            EntityKind::Session => Err(anyhow!("session aggregates are not listable")),
        }
    }

    pub fn build_request(&self, kind: EntityKind, request: &PageRequest) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(Self::endpoint(kind)?)
            .context("invalid data service base URL")?;

        let mut query = page_query(request, request.sort_index.as_str());
        query.push(("year", self.year.to_string()));
        query.push(("namespace", self.namespace.clone()));

        self.http
            .get(endpoint)
            .query(&query)
            .build()
            .context("failed to build data service request")
    }

    /// Interaction lists name the tracked-issue sort `TrackedIssue`.
    pub fn build_interactions_request(
        &self,
        legislator_id: &str,
        request: &PageRequest,
    ) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join("getLegislatorInteractions")
            .context("invalid data service base URL")?;
        let index = match request.sort_index {
            SortIndex::ByTrackedIssue => "TrackedIssue",
            other => other.as_str(),
        };
        let mut query = page_query(request, index);
        query.push(("id", legislator_id.to_string()));

        self.http
            .get(endpoint)
            .query(&query)
            .build()
            .context("failed to build data service request")
    }

    async fn execute<T: DeserializeOwned>(&self, req: reqwest::Request) -> Result<T> {
        debug!(url=%req.url(), "fetching page");
        let res = self
            .http
            .execute(req)
            .await
            .context("failed to reach data service")?;

        if res.status() == StatusCode::TOO_MANY_REQUESTS {
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("received 429 from data service: {}", body));
        }
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("data service error {}: {}", status, body));
        }

        let body = res.text().await.context("failed to read data service response")?;
        serde_json::from_str(&body).context("invalid data service response JSON")
    }
}

fn page_query(request: &PageRequest, index: &str) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("pageSize", request.page_size.to_string()),
        ("index", index.to_string()),
    ];
    if let Some(ascending) = request.ascending {
        query.push(("ascending", ascending.to_string()));
    }
    if let Some(cursor) = &request.cursor {
        query.push(("exclusiveStartKey", cursor.clone()));
    }
    if let Some(key) = &request.sort_key {
        query.push(("sortKey", key.clone()));
    }
    query
}

#[async_trait]
impl ListService<Legislator> for HttpListService {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Legislator>> {
        let req = self.build_request(EntityKind::Legislator, request)?;
        self.execute(req).await
    }
}

#[async_trait]
impl ListService<Bill> for HttpListService {
    async fn fetch_page(&self, request: &PageRequest) -> Result<Vec<Bill>> {
        let req = self.build_request(EntityKind::Bill, request)?;
        self.execute(req).await
    }
}

#[async_trait]
impl InteractionService for HttpListService {
    async fn fetch_interactions(
        &self,
        legislator_id: &str,
        request: &PageRequest,
    ) -> Result<Page<Interaction>> {
        let req = self.build_interactions_request(legislator_id, request)?;
        let page: InteractionPage = self.execute(req).await?;
        Ok(Page {
            items: page.data.into_iter().next().unwrap_or_default(),
            has_more: Some(page.has_more_data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::Cursor;
    use crate::model::Jurisdiction;
    use std::collections::HashMap;

    fn service() -> HttpListService {
        let ctx = JurisdictionContext::new(2025, "us", Jurisdiction::new("co"), "2025A");
        HttpListService::new(
            Url::parse("https://api.example.test/").unwrap(),
            "poliscore-browse/test",
            &ctx,
        )
        .unwrap()
    }

    fn query_of(request: &reqwest::Request) -> HashMap<String, String> {
        request.url().query_pairs().into_owned().collect()
    }

    #[test]
    fn first_page_request_omits_optional_params() {
        let state = QueryState::new(SortIndex::ByRatingAbs, None).unwrap();
        let request = service()
            .build_request(EntityKind::Legislator, &PageRequest::from_state(&state))
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::GET);
        assert_eq!(request.url().path(), "/getLegislators");
        let query = query_of(&request);
        assert_eq!(query["index"], "ObjectsByRatingAbs");
        assert_eq!(query["pageSize"], "25");
        assert_eq!(query["year"], "2025");
        assert_eq!(query["namespace"], "us/co");
        assert!(!query.contains_key("ascending"));
        assert!(!query.contains_key("exclusiveStartKey"));
        assert!(!query.contains_key("sortKey"));
    }

    #[test]
    fn next_page_request_carries_cursor_and_key() {
        let state = QueryState::new(SortIndex::ByTrackedIssue, Some("Healthcare"))
            .unwrap()
            .with_ascending(Some(false))
            .with_cursor(Cursor::from_raw("BIL/us/co/2025A/hb/1~`~12"));
        let request = service()
            .build_request(EntityKind::Bill, &PageRequest::from_state(&state))
            .unwrap();
        assert_eq!(request.url().path(), "/getBills");
        let query = query_of(&request);
        assert_eq!(query["index"], "ObjectsByIssueRating");
        assert_eq!(query["ascending"], "false");
        assert_eq!(query["sortKey"], "Healthcare");
        assert_eq!(query["exclusiveStartKey"], "BIL/us/co/2025A/hb/1~`~12");
    }

    #[test]
    fn interactions_request_pages_by_offset() {
        let state = QueryState::new(SortIndex::ByTrackedIssue, Some("Healthcare"))
            .unwrap()
            .with_cursor(Cursor::from_raw("24"));
        let request = service()
            .build_interactions_request("LEG/us/congress/118/S000033", &PageRequest::from_state(&state))
            .unwrap();
        assert_eq!(request.url().path(), "/getLegislatorInteractions");
        let query = query_of(&request);
        assert_eq!(query["id"], "LEG/us/congress/118/S000033");
        assert_eq!(query["index"], "TrackedIssue");
        assert_eq!(query["exclusiveStartKey"], "24");
        assert!(!query.contains_key("namespace"));
    }

    #[test]
    fn interaction_page_unwraps_nested_list() {
        let page: InteractionPage = serde_json::from_str(
            r#"{"data":[[{"legId":"LEG/us/congress/118/S000033","billId":"BIL/us/congress/118/hr/1"}]],"exclusiveStartKey":-1,"hasMoreData":true}"#,
        )
        .unwrap();
        assert!(page.has_more_data);
        assert_eq!(page.data[0][0].bill_id, "BIL/us/congress/118/hr/1");
    }

    #[test]
    fn session_kind_is_not_listable() {
        let request = PageRequest::from_state(&QueryState::default());
        assert!(service().build_request(EntityKind::Session, &request).is_err());
    }
}
