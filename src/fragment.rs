//! URL fragment codec for list views.
//!
//! The key names and sort aliases are a shareable-link contract. Decoding
//! accepts both dialects and every historical alias; encoding writes the
//! canonical spelling. Cursors never appear in a fragment.
use url::form_urlencoded;

use crate::model::SortIndex;
use crate::query::{check_sort_key, QueryError, QueryState};

/// Decode table. The first alias listed for an index is not necessarily the
/// encoded one; see [`index_alias`].
const ALIASES: &[(&str, SortIndex)] = &[
    ("bydate", SortIndex::ByDate),
    ("byrating", SortIndex::ByRating),
    ("bygrade", SortIndex::ByRating),
    ("byratingabs", SortIndex::ByRatingAbs),
    ("bygradeabs", SortIndex::ByRatingAbs),
    ("byimpact", SortIndex::ByImpact),
    ("byimpactabs", SortIndex::ByImpactAbs),
    ("byhot", SortIndex::ByHot),
    ("state", SortIndex::ByLocation),
    ("bylocation", SortIndex::ByLocation),
];

/// Key spelling used when encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// List pages: `index=byrating&order=descending`.
    Listing,
    /// Detail pages: `sort=byrating&ascending=false`.
    Detail,
}

impl Dialect {
    fn keys(&self) -> (&'static str, &'static str) {
        match self {
            Dialect::Listing => ("index", "order"),
            Dialect::Detail => ("sort", "ascending"),
        }
    }

    fn direction(&self, ascending: bool) -> &'static str {
        match (self, ascending) {
            (Dialect::Listing, true) => "ascending",
            (Dialect::Listing, false) => "descending",
            (Dialect::Detail, true) => "true",
            (Dialect::Detail, false) => "false",
        }
    }
}

/// Direction as found in a fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AscendingParam {
    #[default]
    Absent,
    /// Key present with a value that is not a recognized direction.
    Invalid,
    Value(bool),
}

impl AscendingParam {
    pub fn value(&self) -> Option<bool> {
        match self {
            AscendingParam::Value(ascending) => Some(*ascending),
            AscendingParam::Absent | AscendingParam::Invalid => None,
        }
    }
}

/// Recognized fragment fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FragmentState {
    pub sort_index: Option<SortIndex>,
    pub sort_key: Option<String>,
    pub ascending: AscendingParam,
    pub location: Option<String>,
}

impl FragmentState {
    pub fn is_empty(&self) -> bool {
        self.sort_index.is_none()
            && self.ascending == AscendingParam::Absent
            && self.location.is_none()
    }

    /// Seed a view's state from the fragment, keeping `base`'s page size.
    ///
    /// With a sort in the fragment the direction comes from the fragment
    /// alone; without one, `base`'s sort is kept and only an explicit
    /// direction overrides it.
    pub fn apply_to(&self, base: &QueryState) -> Result<QueryState, QueryError> {
        match self.sort_index {
            Some(index) => {
                let sort_key = check_sort_key(index, self.sort_key.as_deref())?;
                Ok(base.resorted(index, sort_key, self.ascending.value()))
            }
            None => {
                let ascending = match self.ascending {
                    AscendingParam::Absent => base.ascending(),
                    other => other.value(),
                };
                Ok(base.resorted(
                    base.sort_index(),
                    base.sort_key().map(str::to_string),
                    ascending,
                ))
            }
        }
    }
}

/// Canonical alias for an index; tracked-issue sorts encode their key instead.
pub fn index_alias(index: SortIndex) -> Option<&'static str> {
    match index {
        SortIndex::ByDate => Some("bydate"),
        SortIndex::ByRating => Some("byrating"),
        SortIndex::ByRatingAbs => Some("byratingabs"),
        SortIndex::ByImpact => Some("byimpact"),
        SortIndex::ByImpactAbs => Some("byimpactabs"),
        SortIndex::ByHot => Some("byhot"),
        SortIndex::ByLocation => Some("state"),
        SortIndex::ByTrackedIssue => None,
    }
}

pub fn encode(state: &QueryState, location: Option<&str>, dialect: Dialect) -> String {
    let (sort_name, direction_name) = dialect.keys();
    let mut out = form_urlencoded::Serializer::new(String::new());

    let alias = index_alias(state.sort_index()).or(state.sort_key()).unwrap_or_default();
    out.append_pair(sort_name, alias);

    if let Some(ascending) = state.ascending() {
        out.append_pair(direction_name, dialect.direction(ascending));
    }

    if state.sort_index() == SortIndex::ByLocation {
        if let Some(location) = location.map(str::trim).filter(|l| !l.is_empty()) {
            out.append_pair("location", &location.to_ascii_lowercase());
        }
    }

    out.finish()
}

/// Parse a fragment (with or without the leading `#`). Unknown keys are
/// ignored; the first occurrence of a key wins.
pub fn decode(fragment: &str) -> FragmentState {
    let raw = fragment.trim().trim_start_matches('#');
    let mut decoded = FragmentState::default();
    let mut sort_seen = false;

    for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
        match &*key {
            "sort" | "index" if !sort_seen => {
                let value = value.trim();
                if value.is_empty() {
                    continue;
                }
                sort_seen = true;
                match lookup_alias(value) {
                    Some(index) => decoded.sort_index = Some(index),
                    None => {
                        decoded.sort_index = Some(SortIndex::ByTrackedIssue);
                        decoded.sort_key = Some(value.to_string());
                    }
                }
            }
            "ascending" | "order" if decoded.ascending == AscendingParam::Absent => {
                decoded.ascending = parse_direction(&value);
            }
            "location" if decoded.location.is_none() => {
                let value = value.trim();
                if !value.is_empty() {
                    decoded.location = Some(value.to_ascii_lowercase());
                }
            }
            _ => {}
        }
    }

    decoded
}

/// Issue keys spelled like an alias would decode as that sort instead.
pub(crate) fn is_sort_alias(key: &str) -> bool {
    lookup_alias(key).is_some()
}

fn lookup_alias(alias: &str) -> Option<SortIndex> {
    ALIASES
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, index)| *index)
}

fn parse_direction(value: &str) -> AscendingParam {
    match value.trim() {
        "true" | "ascending" => AscendingParam::Value(true),
        "false" | "descending" => AscendingParam::Value(false),
        _ => AscendingParam::Invalid,
    }
}
