use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Issue-stat key carrying an entity's overall rating.
pub const OVERALL_ISSUE: &str = "OverallBenefitToSociety";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SortIndex {
    ByDate,
    ByRating,
    ByRatingAbs,
    ByImpact,
    ByImpactAbs,
    ByLocation,
    ByTrackedIssue,
    ByHot,
}

impl SortIndex {
    pub const ALL: [SortIndex; 8] = [
        SortIndex::ByDate,
        SortIndex::ByRating,
        SortIndex::ByRatingAbs,
        SortIndex::ByImpact,
        SortIndex::ByImpactAbs,
        SortIndex::ByLocation,
        SortIndex::ByTrackedIssue,
        SortIndex::ByHot,
    ];

    /// Index name understood by the remote data service.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortIndex::ByDate => "ObjectsByDate",
            SortIndex::ByRating => "ObjectsByRating",
            SortIndex::ByRatingAbs => "ObjectsByRatingAbs",
            SortIndex::ByImpact => "ObjectsByImpact",
            SortIndex::ByImpactAbs => "ObjectsByImpactAbs",
            SortIndex::ByLocation => "ObjectsByLocation",
            SortIndex::ByTrackedIssue => "ObjectsByIssueRating",
            SortIndex::ByHot => "ObjectsByHot",
        }
    }

    /// Magnitude variant of a signed index.
    pub fn absolute(&self) -> Option<SortIndex> {
        match self {
            SortIndex::ByRating => Some(SortIndex::ByRatingAbs),
            SortIndex::ByImpact => Some(SortIndex::ByImpactAbs),
            _ => None,
        }
    }

    /// Signed variant of a magnitude index.
    pub fn signed(&self) -> Option<SortIndex> {
        match self {
            SortIndex::ByRatingAbs => Some(SortIndex::ByRating),
            SortIndex::ByImpactAbs => Some(SortIndex::ByImpact),
            _ => None,
        }
    }

    pub fn is_absolute(&self) -> bool {
        self.signed().is_some()
    }

    pub fn requires_sort_key(&self) -> bool {
        matches!(self, SortIndex::ByTrackedIssue)
    }
}

impl fmt::Display for SortIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Legislator,
    Bill,
    /// Session-scoped aggregate (party statistics); carries no local id.
    Session,
}

impl EntityKind {
    /// Leading segment of the textual identifier.
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Legislator => "LEG",
            EntityKind::Bill => "BIL",
            EntityKind::Session => "SIT",
        }
    }

    /// Segment used in year-first URL paths.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Legislator => "legislator",
            EntityKind::Bill => "bill",
            EntityKind::Session => "party",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "LEG" => Some(EntityKind::Legislator),
            "BIL" => Some(EntityKind::Bill),
            "SIT" => Some(EntityKind::Session),
            _ => None,
        }
    }

    pub fn from_path_segment(segment: &str) -> Option<Self> {
        match segment {
            "legislator" | "legislators" => Some(EntityKind::Legislator),
            "bill" | "bills" => Some(EntityKind::Bill),
            "party" => Some(EntityKind::Session),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

pub const FEDERAL_CODE: &str = "congress";

const KNOWN_JURISDICTIONS: &[(&str, &str)] = &[
    (FEDERAL_CODE, "Congress"),
    ("al", "Alabama"),
    ("ak", "Alaska"),
    ("az", "Arizona"),
    ("ar", "Arkansas"),
    ("ca", "California"),
    ("co", "Colorado"),
    ("ct", "Connecticut"),
    ("de", "Delaware"),
    ("fl", "Florida"),
    ("ga", "Georgia"),
    ("hi", "Hawaii"),
    ("id", "Idaho"),
    ("il", "Illinois"),
    ("in", "Indiana"),
    ("ia", "Iowa"),
    ("ks", "Kansas"),
    ("ky", "Kentucky"),
    ("la", "Louisiana"),
    ("me", "Maine"),
    ("md", "Maryland"),
    ("ma", "Massachusetts"),
    ("mi", "Michigan"),
    ("mn", "Minnesota"),
    ("ms", "Mississippi"),
    ("mo", "Missouri"),
    ("mt", "Montana"),
    ("ne", "Nebraska"),
    ("nv", "Nevada"),
    ("nh", "New Hampshire"),
    ("nj", "New Jersey"),
    ("nm", "New Mexico"),
    ("ny", "New York"),
    ("nc", "North Carolina"),
    ("nd", "North Dakota"),
    ("oh", "Ohio"),
    ("ok", "Oklahoma"),
    ("or", "Oregon"),
    ("pa", "Pennsylvania"),
    ("ri", "Rhode Island"),
    ("sc", "South Carolina"),
    ("sd", "South Dakota"),
    ("tn", "Tennessee"),
    ("tx", "Texas"),
    ("ut", "Utah"),
    ("vt", "Vermont"),
    ("va", "Virginia"),
    ("wa", "Washington"),
    ("dc", "Washington D.C."),
    ("wv", "West Virginia"),
    ("wi", "Wisconsin"),
    ("wy", "Wyoming"),
    ("pr", "Puerto Rico"),
    ("gu", "Guam"),
    ("vi", "U.S. Virgin Islands"),
    ("as", "American Samoa"),
    ("mp", "Northern Mariana Islands"),
];

/// A legislature scope: the federal Congress or a state/territory code.
///
/// Unknown codes are kept verbatim so data referencing newly added
/// jurisdictions still resolves to a best-effort path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jurisdiction(String);

impl Jurisdiction {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_ascii_lowercase())
    }

    pub fn congress() -> Self {
        Self(FEDERAL_CODE.to_string())
    }

    /// Accepts `US` for Congress, otherwise a subdivision code in any case.
    pub fn from_abbreviation(abbr: &str) -> Self {
        let normalized = abbr.trim().to_ascii_lowercase();
        if normalized == "us" {
            Self::congress()
        } else {
            Self(normalized)
        }
    }

    /// Split a `country/jurisdiction` namespace such as `us/congress`.
    pub fn from_namespace(namespace: &str) -> Option<(String, Self)> {
        let (country, code) = namespace.trim().split_once('/')?;
        if country.is_empty() || code.is_empty() || code.contains('/') {
            return None;
        }
        Some((country.to_ascii_lowercase(), Self::new(code)))
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    pub fn is_federal(&self) -> bool {
        self.0 == FEDERAL_CODE
    }

    pub fn is_known(&self) -> bool {
        self.description().is_some()
    }

    pub fn description(&self) -> Option<&'static str> {
        KNOWN_JURISDICTIONS
            .iter()
            .find(|(code, _)| *code == self.0)
            .map(|(_, name)| *name)
    }

    pub fn known() -> impl Iterator<Item = Jurisdiction> {
        KNOWN_JURISDICTIONS
            .iter()
            .map(|(code, _)| Jurisdiction(code.to_string()))
    }
}

impl fmt::Display for Jurisdiction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Subdivision plus optional district, as used by location-sorted views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub subdivision: String,
    pub district: Option<String>,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.district {
            Some(district) => write!(f, "{}/{}", self.subdivision, district),
            None => f.write_str(&self.subdivision),
        }
    }
}

/// Fields of a listed entity that pagination depends on.
pub trait PageEntity {
    fn id(&self) -> &str;
    fn date_of_record(&self) -> Option<NaiveDate>;
    /// Overall rating when `issue` is `None`, else the rating for that issue.
    fn rating(&self, issue: Option<&str>) -> Option<i32>;
    fn impact(&self) -> Option<i64>;
    fn location(&self) -> Option<Location>;
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssueStats {
    #[serde(default)]
    pub stats: HashMap<String, i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    #[serde(default)]
    pub issue_stats: IssueStats,
    #[serde(default)]
    pub short_explain: Option<String>,
}

impl Interpretation {
    fn rating(&self, issue: Option<&str>) -> Option<i32> {
        self.issue_stats
            .stats
            .get(issue.unwrap_or(OVERALL_ISSUE))
            .copied()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LegislatorName {
    #[serde(default)]
    pub official_full: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Term {
    pub state: String,
    #[serde(default)]
    pub district: Option<String>,
    #[serde(default)]
    pub chamber: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Legislator {
    pub id: String,
    #[serde(default)]
    pub name: LegislatorName,
    #[serde(default)]
    pub birthday: Option<NaiveDate>,
    #[serde(default)]
    pub impact: Option<i64>,
    #[serde(default)]
    pub interpretation: Option<Interpretation>,
    #[serde(default)]
    pub terms: Vec<Term>,
}

impl PageEntity for Legislator {
    fn id(&self) -> &str {
        &self.id
    }

    fn date_of_record(&self) -> Option<NaiveDate> {
        self.birthday
    }

    fn rating(&self, issue: Option<&str>) -> Option<i32> {
        self.interpretation.as_ref()?.rating(issue)
    }

    fn impact(&self) -> Option<i64> {
        self.impact
    }

    fn location(&self) -> Option<Location> {
        let term = self.terms.last()?;
        Some(Location {
            subdivision: term.state.clone(),
            district: term.district.clone(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bill {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub introduced_date: Option<NaiveDate>,
    #[serde(default)]
    pub impact: Option<i64>,
    #[serde(default)]
    pub interpretation: Option<Interpretation>,
}

impl PageEntity for Bill {
    fn id(&self) -> &str {
        &self.id
    }

    fn date_of_record(&self) -> Option<NaiveDate> {
        self.introduced_date
    }

    fn rating(&self, issue: Option<&str>) -> Option<i32> {
        self.interpretation.as_ref()?.rating(issue)
    }

    fn impact(&self) -> Option<i64> {
        self.impact
    }

    fn location(&self) -> Option<Location> {
        None
    }
}

/// One vote or sponsorship on a legislator's detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    #[serde(rename = "@type", default)]
    pub interaction_type: Option<String>,
    pub leg_id: String,
    pub bill_id: String,
    #[serde(default)]
    pub bill_name: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub issue_stats: Option<IssueStats>,
    #[serde(default)]
    pub short_explain: Option<String>,
}

impl PageEntity for Interaction {
    fn id(&self) -> &str {
        &self.bill_id
    }

    fn date_of_record(&self) -> Option<NaiveDate> {
        self.date
    }

    fn rating(&self, issue: Option<&str>) -> Option<i32> {
        self.issue_stats
            .as_ref()?
            .stats
            .get(issue.unwrap_or(OVERALL_ISSUE))
            .copied()
    }

    fn impact(&self) -> Option<i64> {
        None
    }

    fn location(&self) -> Option<Location> {
        None
    }
}
