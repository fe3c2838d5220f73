use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Legislative chamber of a member or a bill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Chamber {
    House,
    Senate,
}

impl Chamber {
    /// Parse `HOUSE` / `SENATE` (case-insensitive, surrounding whitespace ignored).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "HOUSE" => Some(Chamber::House),
            "SENATE" => Some(Chamber::Senate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::House => "HOUSE",
            Chamber::Senate => "SENATE",
        }
    }
}

impl std::fmt::Display for Chamber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stance a bill is scored against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    #[default]
    Support,
    Oppose,
}

impl From<&str> for Position {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "OPPOSE" => Position::Oppose,
            _ => Position::Support,
        }
    }
}

/// Whether a scored column is an ordinary bill or a manually graded action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BillKind {
    #[default]
    Bill,
    Manual,
}

impl From<&str> for BillKind {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "MANUAL" => BillKind::Manual,
            _ => BillKind::Bill,
        }
    }
}

/// Which kinds of member action a bill scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionTypes {
    pub vote: bool,
    pub cosponsor: bool,
}

impl From<&str> for ActionTypes {
    fn from(s: &str) -> Self {
        let lower = s.to_lowercase();
        Self {
            vote: lower.contains("vote"),
            cosponsor: lower.contains("cosponsor"),
        }
    }
}

/// Metadata for one scored column, from `scores_columns_meta.csv`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillMeta {
    /// Column key in the member CSV, e.g. "HR3" or "S1".
    pub column: String,
    pub display_name: String,
    pub short_title: String,
    pub bill_number: String,
    /// Raw `chamber` cell. `None` when the metadata file has no chamber column,
    /// `Some("")` when the column exists but is blank for this bill.
    pub explicit_chamber: Option<String>,
    pub position: Position,
    pub action_types: ActionTypes,
    pub kind: BillKind,
    /// Maximum points awarded for this action.
    pub points: f64,
    pub pair_key: Option<String>,
    pub preferred: bool,
    pub vote_tallies: String,
    pub vote_result: String,
    pub introduced_date: String,
    pub sponsor: String,
    pub sponsor_bioguide_id: Option<String>,
    pub sponsor_name: String,
    pub notes: String,
    pub description: String,
    pub analysis: String,
    pub categories: Vec<String>,
    pub congress_url: String,
    pub learn_more_link: String,
    pub no_cosponsor_benefit: bool,
}

impl BillMeta {
    /// Human label used throughout the views.
    pub fn label(&self) -> &str {
        [&self.display_name, &self.short_title, &self.bill_number]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(|s| s.as_str())
            .unwrap_or(self.column.as_str())
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

/// One member's cell for one scored column, plus its companion flag columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BillCell {
    /// Raw score; `None` when the cell is empty.
    pub score: Option<f64>,
    /// `<bill>_absent`
    pub absent: bool,
    /// `<bill>_not_in_office`
    pub not_in_office: bool,
    /// `<bill>_cosponsor`; `None` when the column is missing or blank.
    pub cosponsor: Option<bool>,
}

/// Precomputed per-category aggregates read from `Total_<cat>` and friends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub total: Option<f64>,
    pub max_possible: Option<f64>,
    pub percent: Option<f64>,
    pub grade: Option<String>,
}

/// One legislator row from `scores_wide.csv`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub bioguide_id: String,
    pub full_name: String,
    pub party: String,
    pub chamber: Chamber,
    pub state: String,
    pub district: String,
    pub photo_url: Option<String>,
    pub birth_year: Option<u16>,
    pub age: Option<u16>,
    pub years_in_office: Option<f64>,
    pub office_phone: Option<String>,
    pub office_address: Option<String>,
    pub district_offices: Vec<String>,
    pub committees: Vec<String>,
    pub aipac_supported: Option<String>,
    pub dmfi_supported: Option<String>,
    pub reject_commitment: Option<String>,
    pub reject_aipac_commitment: Option<String>,
    pub reject_aipac_link: Option<String>,
    /// Overall aggregates (`Total`, `Max_Possible`, `Percent`, `Grade`).
    pub overall: CategoryScore,
    /// Keyed by category field suffix, e.g. "Israel_Gaza".
    pub category_scores: BTreeMap<String, CategoryScore>,
    /// Keyed by scored column id.
    pub cells: HashMap<String, BillCell>,
}

impl Member {
    pub fn cell(&self, column: &str) -> BillCell {
        self.cells.get(column).copied().unwrap_or_default()
    }

    pub fn score(&self, column: &str) -> Option<f64> {
        self.cells.get(column).and_then(|c| c.score)
    }

    /// Look up a numeric value by raw CSV column name, resolving companion
    /// `_cosponsor`, `_absent` and `_not_in_office` columns onto their bill cell.
    pub fn value_of(&self, raw_column: &str) -> Option<f64> {
        if let Some(cell) = self.cells.get(raw_column) {
            return cell.score;
        }
        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        if let Some(bill) = raw_column.strip_suffix("_cosponsor") {
            return self
                .cells
                .get(bill)
                .and_then(|c| c.cosponsor)
                .map(flag);
        }
        if let Some(bill) = raw_column.strip_suffix("_absent") {
            return self.cells.get(bill).map(|c| flag(c.absent));
        }
        if let Some(bill) = raw_column.strip_suffix("_not_in_office") {
            return self.cells.get(bill).map(|c| flag(c.not_in_office));
        }
        None
    }

    /// Case-insensitive name key used by every member listing.
    pub fn sort_key(&self) -> String {
        self.full_name.to_lowercase()
    }
}

/// One lobby's funding for one election cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LobbyFunding {
    pub direct: f64,
    pub earmark: f64,
    pub ie_support: f64,
    pub ie_total: f64,
    pub total: f64,
    pub supported: bool,
}

impl LobbyFunding {
    pub fn has_dollars(&self) -> bool {
        self.direct > 0.0 || self.earmark > 0.0 || self.ie_support > 0.0 || self.total > 0.0
    }
}

/// Election cycles carried by the PAC dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Cycle {
    #[serde(rename = "2022")]
    Y2022,
    #[serde(rename = "2024")]
    Y2024,
    #[serde(rename = "2026")]
    Y2026,
}

impl Cycle {
    pub const ALL: [Cycle; 3] = [Cycle::Y2022, Cycle::Y2024, Cycle::Y2026];

    pub fn year(&self) -> u16 {
        match self {
            Cycle::Y2022 => 2022,
            Cycle::Y2024 => 2024,
            Cycle::Y2026 => 2026,
        }
    }

    /// Most recent completed election.
    pub fn last() -> Self {
        Cycle::Y2024
    }

    /// Upcoming election.
    pub fn next() -> Self {
        Cycle::Y2026
    }
}

/// Funding from both lobbies for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleFunding {
    pub aipac: LobbyFunding,
    pub dmfi: LobbyFunding,
}

impl CycleFunding {
    pub fn total(&self) -> f64 {
        self.aipac.total + self.dmfi.total
    }
}

/// PAC spending and endorsement record for one member.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacRecord {
    pub bioguide_id: String,
    pub full_name: String,
    pub aipac_featured: bool,
    pub dmfi_website: bool,
    pub cycles: BTreeMap<Cycle, CycleFunding>,
}

impl PacRecord {
    pub fn cycle(&self, cycle: Cycle) -> CycleFunding {
        self.cycles.get(&cycle).copied().unwrap_or_default()
    }
}

/// A custom label for one observed score of a manually graded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManualLabel {
    pub label: String,
    pub score: f64,
    pub description: String,
}

/// A share-image sentence rule from `graphic_sentences.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceRule {
    pub chamber: Chamber,
    pub columns: Vec<String>,
    pub check_positive_points: bool,
    pub good_text: Option<String>,
    pub bad_text: Option<String>,
    pub ending: String,
}

/// The immutable snapshot every view derives from.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub members: Vec<Member>,
    /// Scored columns in member-CSV header order.
    pub columns: Vec<String>,
    pub meta_by_col: HashMap<String, BillMeta>,
    /// Sorted union of bill categories, reserved tags removed.
    pub categories: Vec<String>,
    pub pac: HashMap<String, PacRecord>,
    /// Keyed by bill label, ordered by score.
    pub manual_labels: HashMap<String, Vec<ManualLabel>>,
    pub sentence_rules: Vec<SentenceRule>,
    /// SHA-256 over the primary data files.
    pub fingerprint: String,
}

impl Dataset {
    pub fn member(&self, bioguide_id: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.bioguide_id == bioguide_id)
    }

    pub fn meta(&self, column: &str) -> Option<&BillMeta> {
        self.meta_by_col.get(column)
    }

    pub fn pac_for(&self, bioguide_id: &str) -> Option<&PacRecord> {
        self.pac.get(bioguide_id)
    }

    /// Metadata in column order.
    pub fn bills(&self) -> impl Iterator<Item = &BillMeta> {
        self.columns.iter().filter_map(|c| self.meta_by_col.get(c))
    }

    pub fn manual_label(&self, bill_label: &str, score: f64) -> Option<&ManualLabel> {
        self.manual_labels
            .get(bill_label)?
            .iter()
            .find(|l| (l.score - score).abs() < f64::EPSILON)
    }
}
