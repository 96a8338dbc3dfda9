//! Conversion between entity identifiers, year-first URL paths and calendar
//! years.
//!
//! Path generation is fully determined by the identifier. Parsing a path back
//! needs the caller's [`JurisdictionContext`], because the path never encodes
//! the session code.
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;
use tracing::{debug, warn};

use crate::model::{EntityKind, Jurisdiction};

const FIRST_CONGRESS_YEAR: i32 = 1789;

/// Year-first shape only; segments after the year are split by hand so any
/// jurisdiction code is accepted.
static ROUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/?(\d{4})/(.+)$").expect("route regex"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("identifier '{0}' has fewer than four segments")]
    TooShort(String),
    #[error("unknown identifier prefix '{0}'")]
    UnknownPrefix(String),
    #[error("identifier '{0}' is missing its local id")]
    MissingLocalId(String),
    #[error("'{0}' is not a year-first path")]
    NotARoute(String),
    #[error("path '{path}' names a {found}, expected a {expected}")]
    WrongKind {
        path: String,
        expected: EntityKind,
        found: EntityKind,
    },
}

/// Ambient year, jurisdiction and session used to complete bare paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionContext {
    pub current_year: i32,
    pub country: String,
    pub jurisdiction: Jurisdiction,
    pub session_code: String,
}

impl JurisdictionContext {
    pub fn new(
        current_year: i32,
        country: impl Into<String>,
        jurisdiction: Jurisdiction,
        session_code: impl Into<String>,
    ) -> Self {
        Self {
            current_year,
            country: country.into(),
            jurisdiction,
            session_code: session_code.into(),
        }
    }

    /// Federal context for `year`, with the session derived arithmetically.
    pub fn federal(year: i32) -> Self {
        Self::new(
            year,
            "us",
            Jurisdiction::congress(),
            year_to_federal_session(year).to_string(),
        )
    }

    pub fn namespace(&self) -> String {
        format!("{}/{}", self.country, self.jurisdiction)
    }
}

/// `KIND/country/jurisdiction/session[/local]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityIdentifier {
    pub kind: EntityKind,
    pub country: String,
    pub jurisdiction: Jurisdiction,
    pub session_code: String,
    pub local_id: Option<String>,
}

impl EntityIdentifier {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        let parts: Vec<&str> = raw.splitn(5, '/').collect();
        if parts.len() < 4 || parts[..4].iter().any(|p| p.is_empty()) {
            return Err(IdentifierError::TooShort(raw.to_string()));
        }
        let kind = EntityKind::from_prefix(parts[0])
            .ok_or_else(|| IdentifierError::UnknownPrefix(parts[0].to_string()))?;
        let local_id = parts.get(4).filter(|s| !s.is_empty()).map(|s| s.to_string());
        if local_id.is_none() && kind != EntityKind::Session {
            return Err(IdentifierError::MissingLocalId(raw.to_string()));
        }

        Ok(Self {
            kind,
            country: parts[1].to_string(),
            jurisdiction: Jurisdiction::new(parts[2]),
            session_code: parts[3].to_string(),
            local_id,
        })
    }

    pub fn namespace(&self) -> String {
        format!("{}/{}", self.country, self.jurisdiction)
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.kind.prefix(),
            self.country,
            self.jurisdiction,
            self.session_code
        )?;
        if let Some(local) = &self.local_id {
            write!(f, "/{}", local)?;
        }
        Ok(())
    }
}

/// A parsed year-first path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub year: i32,
    pub jurisdiction: Jurisdiction,
    pub kind: EntityKind,
    pub local: Option<String>,
}

impl Route {
    /// Complete the route into an identifier. Federal routes derive the
    /// session from the year; other jurisdictions take the context's session.
    pub fn to_identifier(&self, ctx: &JurisdictionContext) -> EntityIdentifier {
        let session_code = if self.jurisdiction.is_federal() {
            year_to_federal_session(self.year).to_string()
        } else {
            ctx.session_code.clone()
        };
        EntityIdentifier {
            kind: self.kind,
            country: ctx.country.clone(),
            jurisdiction: self.jurisdiction.clone(),
            session_code,
            local_id: self.local.clone(),
        }
    }
}

pub fn year_to_federal_session(year: i32) -> i32 {
    let session = (i64::from(year) - i64::from(FIRST_CONGRESS_YEAR)).div_euclid(2) + 1;
    // Halving keeps the result within i32 for every i32 year.
    session as i32
}

/// Second calendar year of the two-year federal session, or `None` when the
/// session number is too large for a year.
pub fn federal_session_to_year(session: i32) -> Option<i32> {
    session
        .checked_sub(1)?
        .checked_mul(2)?
        .checked_add(FIRST_CONGRESS_YEAR + 1)
}

/// Calendar year for a session code.
///
/// Only federal session numbers convert arithmetically. Every other
/// jurisdiction reports the context's current year.
pub fn session_code_to_year(
    session_code: &str,
    jurisdiction: &Jurisdiction,
    ctx: &JurisdictionContext,
) -> i32 {
    if !jurisdiction.is_federal() {
        return ctx.current_year;
    }
    match session_code.trim().parse::<i32>().ok().and_then(federal_session_to_year) {
        Some(year) => year,
        None => {
            warn!(session_code, "unusable federal session code; using current year");
            ctx.current_year
        }
    }
}

/// `/{year}/[{jurisdiction}/]{path}` with the jurisdiction omitted for Congress.
pub fn route_path(jurisdiction: &Jurisdiction, year: i32, path: &str) -> String {
    if jurisdiction.is_federal() {
        format!("/{}/{}", year, path)
    } else {
        format!("/{}/{}/{}", year, jurisdiction, path)
    }
}

pub fn identifier_to_path(id: &EntityIdentifier, ctx: &JurisdictionContext) -> String {
    if !id.jurisdiction.is_known() {
        debug!(jurisdiction = %id.jurisdiction, "building path for unrecognized jurisdiction");
    }
    let year = session_code_to_year(&id.session_code, &id.jurisdiction, ctx);
    let tail = match &id.local_id {
        Some(local) => format!("{}/{}", id.kind.path_segment(), local),
        None => id.kind.path_segment().to_string(),
    };
    route_path(&id.jurisdiction, year, &tail)
}

fn route_kind(segment: &str) -> Option<EntityKind> {
    [EntityKind::Legislator, EntityKind::Bill, EntityKind::Session]
        .into_iter()
        .find(|kind| kind.path_segment() == segment)
}

fn split_segment(s: &str) -> (&str, Option<&str>) {
    match s.split_once('/') {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    }
}

pub fn parse_route(path: &str) -> Result<Route, IdentifierError> {
    let not_a_route = || IdentifierError::NotARoute(path.to_string());
    let caps = ROUTE_RE.captures(path.trim()).ok_or_else(not_a_route)?;
    let year = caps[1].parse::<i32>().map_err(|_| not_a_route())?;

    let (head, tail) = split_segment(caps[2].trim_end_matches('/'));
    let (jurisdiction, kind, local) = match route_kind(head) {
        Some(kind) => (Jurisdiction::congress(), kind, tail),
        None => {
            let (segment, local) = split_segment(tail.ok_or_else(not_a_route)?);
            let kind = route_kind(segment).ok_or_else(not_a_route)?;
            (Jurisdiction::new(head), kind, local)
        }
    };
    if jurisdiction.code().is_empty() {
        return Err(not_a_route());
    }
    let local = local.filter(|s| !s.is_empty()).map(str::to_string);

    Ok(Route {
        year,
        jurisdiction,
        kind,
        local,
    })
}

/// Resolve a path segment from the router into a full identifier.
///
/// Accepts an already-complete identifier, a full year-first path, or a bare
/// local id. A bare local id is completed with the context's jurisdiction and
/// current session code. Anything shaped like a year-first path must parse as
/// one and name `kind`.
pub fn path_to_identifier(
    path: &str,
    kind: EntityKind,
    ctx: &JurisdictionContext,
) -> Result<EntityIdentifier, IdentifierError> {
    let trimmed = path.trim();
    if trimmed.starts_with(&format!("{}/", kind.prefix())) {
        return EntityIdentifier::parse(trimmed);
    }
    if ROUTE_RE.is_match(trimmed) {
        let route = parse_route(trimmed)?;
        if route.kind != kind {
            return Err(IdentifierError::WrongKind {
                path: path.to_string(),
                expected: kind,
                found: route.kind,
            });
        }
        return Ok(route.to_identifier(ctx));
    }

    let local = trimmed.trim_matches('/');
    let local_id = if local.is_empty() {
        None
    } else {
        Some(local.to_string())
    };
    if local_id.is_none() && kind != EntityKind::Session {
        return Err(IdentifierError::MissingLocalId(path.to_string()));
    }

    Ok(EntityIdentifier {
        kind,
        country: ctx.country.clone(),
        jurisdiction: ctx.jurisdiction.clone(),
        session_code: ctx.session_code.clone(),
        local_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colorado() -> JurisdictionContext {
        JurisdictionContext::new(2025, "us", Jurisdiction::new("co"), "2025A")
    }

    #[test]
    fn federal_session_arithmetic() {
        assert_eq!(year_to_federal_session(1789), 1);
        assert_eq!(year_to_federal_session(1790), 1);
        assert_eq!(year_to_federal_session(2023), 118);
        assert_eq!(year_to_federal_session(2024), 118);
        assert_eq!(year_to_federal_session(2025), 119);
        assert_eq!(federal_session_to_year(1), Some(1790));
        assert_eq!(federal_session_to_year(118), Some(2024));
        assert_eq!(federal_session_to_year(119), Some(2026));
        assert_eq!(federal_session_to_year(2_000_000_000), None);
        assert_eq!(federal_session_to_year(i32::MIN), None);
        assert_eq!(year_to_federal_session(i32::MIN), -1_073_742_718);
        assert_eq!(year_to_federal_session(i32::MAX), 1_073_740_930);
    }

    #[test]
    fn session_year_round_trip_lands_on_second_year() {
        for year in 1789..2200 {
            let expected = if (year - 1789) % 2 == 0 { year + 1 } else { year };
            assert_eq!(federal_session_to_year(year_to_federal_session(year)), Some(expected));
        }
    }

    #[test]
    fn state_session_codes_use_context_year() {
        let ctx = colorado();
        assert_eq!(session_code_to_year("2025A", &Jurisdiction::new("co"), &ctx), 2025);
        assert_eq!(session_code_to_year("118", &Jurisdiction::new("co"), &ctx), 2025);
        assert_eq!(session_code_to_year("118", &Jurisdiction::congress(), &ctx), 2024);
        assert_eq!(session_code_to_year("xx", &Jurisdiction::congress(), &ctx), 2025);
    }

    #[test]
    fn oversized_federal_session_falls_back_to_current_year() {
        let ctx = JurisdictionContext::federal(2024);
        assert_eq!(session_code_to_year("2000000000", &Jurisdiction::congress(), &ctx), 2024);
        let id = EntityIdentifier::parse("BIL/us/congress/2000000000/hr/1").unwrap();
        assert_eq!(identifier_to_path(&id, &ctx), "/2024/bill/hr/1");
    }

    #[test]
    fn identifier_parse_and_display() {
        let id = EntityIdentifier::parse("BIL/us/congress/118/hr/1234").unwrap();
        assert_eq!(id.kind, EntityKind::Bill);
        assert_eq!(id.local_id.as_deref(), Some("hr/1234"));
        assert_eq!(id.to_string(), "BIL/us/congress/118/hr/1234");
        assert_eq!(id.namespace(), "us/congress");

        let session = EntityIdentifier::parse("SIT/us/congress/118").unwrap();
        assert!(session.local_id.is_none());

        assert!(matches!(
            EntityIdentifier::parse("LEG/us/congress"),
            Err(IdentifierError::TooShort(_))
        ));
        assert!(matches!(
            EntityIdentifier::parse("XYZ/us/congress/118/a"),
            Err(IdentifierError::UnknownPrefix(_))
        ));
        assert!(matches!(
            EntityIdentifier::parse("LEG/us/congress/118"),
            Err(IdentifierError::MissingLocalId(_))
        ));
    }

    #[test]
    fn federal_paths_omit_jurisdiction() {
        let ctx = JurisdictionContext::federal(2024);
        let bill = EntityIdentifier::parse("BIL/us/congress/118/hr/1234").unwrap();
        assert_eq!(identifier_to_path(&bill, &ctx), "/2024/bill/hr/1234");
        let leg = EntityIdentifier::parse("LEG/us/congress/118/S000033").unwrap();
        assert_eq!(identifier_to_path(&leg, &ctx), "/2024/legislator/S000033");
        let session = EntityIdentifier::parse("SIT/us/congress/118").unwrap();
        assert_eq!(identifier_to_path(&session, &ctx), "/2024/party");
    }

    #[test]
    fn state_paths_include_jurisdiction() {
        let ctx = colorado();
        let bill = EntityIdentifier::parse("BIL/us/co/2025A/hb/1001").unwrap();
        assert_eq!(identifier_to_path(&bill, &ctx), "/2025/co/bill/hb/1001");
    }

    #[test]
    fn unknown_jurisdiction_degrades_to_raw_code() {
        let ctx = colorado();
        let id = EntityIdentifier::parse("LEG/us/zz/2030/X1").unwrap();
        assert_eq!(identifier_to_path(&id, &ctx), "/2025/zz/legislator/X1");
    }

    #[test]
    fn bare_local_id_uses_context_session() {
        let ctx = colorado();
        let id = path_to_identifier("hb/1001", EntityKind::Bill, &ctx).unwrap();
        assert_eq!(id.to_string(), "BIL/us/co/2025A/hb/1001");

        let id = path_to_identifier("/S000033", EntityKind::Legislator, &JurisdictionContext::federal(2024))
            .unwrap();
        assert_eq!(id.to_string(), "LEG/us/congress/118/S000033");
    }

    #[test]
    fn complete_identifier_passes_through() {
        let ctx = colorado();
        let id = path_to_identifier("LEG/us/congress/117/S000033", EntityKind::Legislator, &ctx)
            .unwrap();
        assert_eq!(id.session_code, "117");
        assert!(id.jurisdiction.is_federal());
    }

    #[test]
    fn full_route_parses_back() {
        let route = parse_route("/2025/co/bill/hb/1001").unwrap();
        assert_eq!(route.year, 2025);
        assert_eq!(route.jurisdiction.code(), "co");
        assert_eq!(route.kind, EntityKind::Bill);
        assert_eq!(route.local.as_deref(), Some("hb/1001"));

        let route = parse_route("/2024/legislator/S000033").unwrap();
        assert!(route.jurisdiction.is_federal());
        let id = route.to_identifier(&colorado());
        assert_eq!(id.to_string(), "LEG/us/congress/118/S000033");

        assert!(parse_route("/legislators").is_err());
        assert!(parse_route("/2024/hr/1").is_err());
    }

    #[test]
    fn unknown_long_jurisdiction_round_trips() {
        let ctx = JurisdictionContext::new(2024, "us", Jurisdiction::new("usvi"), "2024");
        let id = EntityIdentifier::parse("BIL/us/usvi/2024/hb/1").unwrap();
        let path = identifier_to_path(&id, &ctx);
        assert_eq!(path, "/2024/usvi/bill/hb/1");
        assert_eq!(path_to_identifier(&path, EntityKind::Bill, &ctx).unwrap(), id);

        let federal = JurisdictionContext::federal(2024);
        let resolved = path_to_identifier(&path, EntityKind::Bill, &federal).unwrap();
        assert_eq!(resolved.jurisdiction, Jurisdiction::new("usvi"));
        assert_eq!(resolved.local_id.as_deref(), Some("hb/1"));
    }

    #[test]
    fn malformed_year_first_path_is_rejected() {
        let ctx = JurisdictionContext::federal(2024);
        assert_eq!(
            path_to_identifier("/2024/usvi/hb/1", EntityKind::Bill, &ctx),
            Err(IdentifierError::NotARoute("/2024/usvi/hb/1".into()))
        );
        assert!(matches!(
            path_to_identifier("/2024/co/legislator/X1", EntityKind::Bill, &ctx),
            Err(IdentifierError::WrongKind {
                expected: EntityKind::Bill,
                found: EntityKind::Legislator,
                ..
            })
        ));
    }
}
