/// Fetches and parses the static scorecard files into an immutable [`Dataset`].
///
/// Files:
/// - `scores_wide.csv` (required): one row per member, one column per scored action
/// - `scores_columns_meta.csv` (required): one row per scored column
/// - `pac_data.csv`, `manual_scoring_meta.csv`, `graphic_sentences.csv` (optional)
///
/// Optional files that are missing or malformed are logged and treated as empty.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use csv::StringRecord;
use sha2::{Digest, Sha256};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::error::CommonError;
use crate::model::{
    ActionTypes, BillCell, BillKind, BillMeta, CategoryScore, Chamber, Cycle, CycleFunding,
    Dataset, LobbyFunding, ManualLabel, Member, PacRecord, Position, SentenceRule,
};
use crate::normalize::{is_truthy, split_list};

pub const SCORES_FILE: &str = "scores_wide.csv";
pub const META_FILE: &str = "scores_columns_meta.csv";
pub const PAC_FILE: &str = "pac_data.csv";
pub const MANUAL_LABELS_FILE: &str = "manual_scoring_meta.csv";
pub const SENTENCES_FILE: &str = "graphic_sentences.csv";

/// Category tag used only for PAC bookkeeping; never graded.
pub const RESERVED_CATEGORY: &str = "AIPAC";

const AGGREGATE_PREFIXES: [&str; 4] = ["Total", "Max_Possible", "Percent", "Grade"];

/// Where the raw data files come from.
pub trait DataSource: Send + Sync {
    fn fetch(&self, name: &str) -> impl Future<Output = Result<String, CommonError>> + Send;
}

/// Reads data files from a local directory.
#[derive(Debug, Clone)]
pub struct FsSource {
    dir: PathBuf,
}

impl FsSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl DataSource for FsSource {
    async fn fetch(&self, name: &str) -> Result<String, CommonError> {
        let path = self.dir.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| CommonError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Reads data files from a static HTTP host, e.g. `https://example.org/data`.
#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    http: reqwest::Client,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CommonError> {
        let http = reqwest::Client::builder()
            .user_agent("scorecard/data-loader")
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }
}

impl DataSource for HttpSource {
    async fn fetch(&self, name: &str) -> Result<String, CommonError> {
        let url = format!("{}/{name}", self.base_url);
        let resp = self.http.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(CommonError::SourceStatus {
                name: name.to_string(),
                status: resp.status().as_u16(),
            });
        }
        Ok(resp.text().await?)
    }
}

/// Either source, chosen at start-up from configuration.
#[derive(Debug, Clone)]
pub enum AnySource {
    Fs(FsSource),
    Http(HttpSource),
}

impl DataSource for AnySource {
    async fn fetch(&self, name: &str) -> Result<String, CommonError> {
        match self {
            AnySource::Fs(s) => s.fetch(name).await,
            AnySource::Http(s) => s.fetch(name).await,
        }
    }
}

/// Process-wide memoized dataset.
///
/// The first successful [`DataStore::load`] is cached for the life of the store; concurrent
/// first callers share a single fetch. A failed load leaves the cache empty so the next call
/// tries again.
pub struct DataStore<S> {
    source: S,
    cell: OnceCell<Arc<Dataset>>,
}

impl<S: DataSource> DataStore<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cell: OnceCell::new(),
        }
    }

    pub async fn load(&self) -> Result<Arc<Dataset>, CommonError> {
        self.cell
            .get_or_try_init(|| async {
                let dataset = load_dataset(&self.source).await?;
                info!(
                    members = dataset.members.len(),
                    columns = dataset.columns.len(),
                    categories = dataset.categories.len(),
                    pac_records = dataset.pac.len(),
                    fingerprint = %dataset.fingerprint,
                    "dataset loaded"
                );
                Ok(Arc::new(dataset))
            })
            .await
            .map(Arc::clone)
    }

    /// The cached dataset, if a load has already succeeded.
    pub fn cached(&self) -> Option<Arc<Dataset>> {
        self.cell.get().cloned()
    }
}

async fn load_dataset<S: DataSource>(source: &S) -> Result<Dataset, CommonError> {
    let (scores_text, meta_text) =
        futures::try_join!(source.fetch(SCORES_FILE), source.fetch(META_FILE))?;
    let (pac_text, labels_text, rules_text) = futures::join!(
        fetch_optional(source, PAC_FILE),
        fetch_optional(source, MANUAL_LABELS_FILE),
        fetch_optional(source, SENTENCES_FILE),
    );

    let meta = parse_meta(&meta_text)?;
    let parsed = parse_members(&scores_text, &meta)?;

    let pac = pac_text
        .map(|text| parse_or_empty(PAC_FILE, parse_pac(&text)))
        .unwrap_or_default();
    let manual_labels = labels_text
        .map(|text| parse_or_empty(MANUAL_LABELS_FILE, parse_manual_labels(&text)))
        .unwrap_or_default();
    let sentence_rules = rules_text
        .map(|text| parse_or_empty(SENTENCES_FILE, parse_sentence_rules(&text)))
        .unwrap_or_default();

    let meta_by_col: HashMap<String, BillMeta> = meta
        .into_iter()
        .filter(|m| parsed.columns.contains(&m.column))
        .map(|m| (m.column.clone(), m))
        .collect();
    let categories = collect_categories(meta_by_col.values());

    Ok(Dataset {
        members: parsed.members,
        columns: parsed.columns,
        meta_by_col,
        categories,
        pac,
        manual_labels,
        sentence_rules,
        fingerprint: fingerprint(&[&scores_text, &meta_text]),
    })
}

async fn fetch_optional<S: DataSource>(source: &S, name: &str) -> Option<String> {
    source
        .fetch(name)
        .await
        .inspect_err(|e| warn!(error = %e, file = name, "optional data file unavailable"))
        .ok()
}

fn parse_or_empty<T: Default>(name: &str, result: Result<T, CommonError>) -> T {
    result
        .inspect_err(|e| warn!(error = %e, file = name, "optional data file malformed, ignoring"))
        .unwrap_or_default()
}

fn fingerprint(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\0");
    }
    format!("{:x}", hasher.finalize())
}

/// Sorted union of all bill categories, minus the reserved tag.
pub fn collect_categories<'a>(metas: impl IntoIterator<Item = &'a BillMeta>) -> Vec<String> {
    metas
        .into_iter()
        .flat_map(|m| m.categories.iter())
        .filter(|c| c.as_str() != RESERVED_CATEGORY)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Header name → index lookup over one CSV file.
struct Columns<'h> {
    name: &'h str,
    index: HashMap<String, usize>,
}

impl<'h> Columns<'h> {
    fn new(name: &'h str, headers: &StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_string(), i))
            .collect();
        Self { name, index }
    }

    fn has(&self, column: &str) -> bool {
        self.index.contains_key(column)
    }

    fn require(&self, column: &str) -> Result<usize, CommonError> {
        self.index
            .get(column)
            .copied()
            .ok_or_else(|| CommonError::MissingColumn {
                name: self.name.to_string(),
                column: column.to_string(),
            })
    }

    fn str<'r>(&self, record: &'r StringRecord, column: &str) -> &'r str {
        self.index
            .get(column)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }

    fn opt(&self, record: &StringRecord, column: &str) -> Option<String> {
        let s = self.str(record, column);
        (!s.is_empty()).then(|| s.to_string())
    }

    fn num(&self, record: &StringRecord, column: &str) -> Option<f64> {
        parse_number(self.str(record, column))
    }

    /// A non-negative integer that fits in `u16`; anything else reads as missing.
    fn whole(&self, record: &StringRecord, column: &str) -> Option<u16> {
        self.num(record, column)
            .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u16::MAX)).contains(n))
            .map(|n| n as u16)
    }

    fn flag(&self, record: &StringRecord, column: &str) -> bool {
        is_truthy(self.str(record, column))
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(text.as_bytes())
}

fn csv_error(name: &str) -> impl Fn(csv::Error) -> CommonError + '_ {
    move |source| CommonError::Csv {
        name: name.to_string(),
        source,
    }
}

/// Parse `scores_columns_meta.csv`. Duplicate columns keep the first record.
pub fn parse_meta(text: &str) -> Result<Vec<BillMeta>, CommonError> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(csv_error(META_FILE))?.clone();
    let cols = Columns::new(META_FILE, &headers);
    cols.require("column")?;
    let has_chamber = cols.has("chamber");

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error(META_FILE))?;
        let column = cols.str(&record, "column").to_string();
        if column.is_empty() {
            continue;
        }
        if !seen.insert(column.clone()) {
            warn!(column = %column, "duplicate metadata record, keeping the first");
            continue;
        }
        out.push(BillMeta {
            display_name: cols.str(&record, "display_name").to_string(),
            short_title: cols.str(&record, "short_title").to_string(),
            bill_number: cols.str(&record, "bill_number").to_string(),
            explicit_chamber: has_chamber
                .then(|| cols.str(&record, "chamber").to_uppercase()),
            position: Position::from(cols.str(&record, "position_to_score")),
            action_types: ActionTypes::from(cols.str(&record, "action_types")),
            kind: BillKind::from(cols.str(&record, "type")),
            points: cols.num(&record, "points").unwrap_or(0.0),
            pair_key: cols.opt(&record, "pair_key"),
            preferred: cols.flag(&record, "preferred"),
            vote_tallies: cols.str(&record, "vote_tallies").to_string(),
            vote_result: cols.str(&record, "vote_result").to_string(),
            introduced_date: cols.str(&record, "introduced_date").to_string(),
            sponsor: cols.str(&record, "sponsor").to_string(),
            sponsor_bioguide_id: cols.opt(&record, "sponsor_bioguide_id"),
            sponsor_name: cols.str(&record, "sponsor_name").to_string(),
            notes: cols.str(&record, "notes").to_string(),
            description: cols.str(&record, "description").to_string(),
            analysis: cols.str(&record, "analysis").to_string(),
            categories: split_list(cols.str(&record, "categories")),
            congress_url: cols.str(&record, "congress_url").to_string(),
            learn_more_link: cols.str(&record, "learn_more_link").to_string(),
            no_cosponsor_benefit: cols.flag(&record, "no_cosponsor_benefit"),
            column,
        });
    }
    Ok(out)
}

/// Members plus the scored columns found in the header, in header order.
pub struct ParsedMembers {
    pub members: Vec<Member>,
    pub columns: Vec<String>,
}

/// Parse `scores_wide.csv` against the bill metadata.
///
/// A header is a scored column when it has a metadata record. Rows without a bioguide id,
/// with an unrecognized chamber, or repeating an earlier bioguide id are skipped.
pub fn parse_members(text: &str, meta: &[BillMeta]) -> Result<ParsedMembers, CommonError> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(csv_error(SCORES_FILE))?.clone();
    let cols = Columns::new(SCORES_FILE, &headers);
    cols.require("bioguide_id")?;
    cols.require("chamber")?;

    let known: HashSet<&str> = meta.iter().map(|m| m.column.as_str()).collect();
    let columns: Vec<String> = headers
        .iter()
        .map(str::trim)
        .filter(|h| known.contains(h))
        .map(str::to_string)
        .collect();
    for header in headers.iter().map(str::trim) {
        if looks_like_bill_column(header) && !known.contains(header) {
            warn!(column = header, "scored column has no metadata, ignoring");
        }
    }

    let suffixes = category_suffixes(&headers);

    let mut seen = HashSet::new();
    let mut members = Vec::new();
    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_error(SCORES_FILE))?;
        let bioguide_id = cols.str(&record, "bioguide_id").to_string();
        if bioguide_id.is_empty() {
            warn!(line = line + 2, "member row without bioguide_id, skipping");
            continue;
        }
        let Some(chamber) = Chamber::parse(cols.str(&record, "chamber")) else {
            warn!(bioguide_id = %bioguide_id, chamber = cols.str(&record, "chamber"), "unknown chamber, skipping");
            continue;
        };
        if !seen.insert(bioguide_id.clone()) {
            warn!(bioguide_id = %bioguide_id, "duplicate member row, keeping the first");
            continue;
        }

        let cells = columns
            .iter()
            .map(|col| {
                let cell = BillCell {
                    score: cols.num(&record, col),
                    absent: cols.flag(&record, &format!("{col}_absent")),
                    not_in_office: cols.flag(&record, &format!("{col}_not_in_office")),
                    cosponsor: cols
                        .opt(&record, &format!("{col}_cosponsor"))
                        .map(|v| is_truthy(&v)),
                };
                (col.clone(), cell)
            })
            .collect();

        let category_scores = suffixes
            .iter()
            .map(|suffix| (suffix.clone(), category_score(&cols, &record, &format!("_{suffix}"))))
            .collect();

        members.push(Member {
            full_name: cols.str(&record, "full_name").to_string(),
            party: cols.str(&record, "party").to_string(),
            chamber,
            state: cols.str(&record, "state").to_string(),
            district: cols.str(&record, "district").to_string(),
            photo_url: cols.opt(&record, "photo_url"),
            birth_year: cols.whole(&record, "birth_year"),
            age: cols.whole(&record, "age"),
            years_in_office: cols.num(&record, "years_in_office"),
            office_phone: cols.opt(&record, "office_phone"),
            office_address: cols.opt(&record, "office_address"),
            district_offices: split_list(cols.str(&record, "district_offices")),
            committees: split_list(cols.str(&record, "committees")),
            aipac_supported: cols.opt(&record, "aipac_supported"),
            dmfi_supported: cols.opt(&record, "dmfi_supported"),
            reject_commitment: cols.opt(&record, "reject_commitment"),
            reject_aipac_commitment: cols.opt(&record, "reject_aipac_commitment"),
            reject_aipac_link: cols.opt(&record, "reject_aipac_link"),
            overall: category_score(&cols, &record, ""),
            category_scores,
            cells,
            bioguide_id,
        });
    }

    Ok(ParsedMembers { members, columns })
}

fn category_score(cols: &Columns<'_>, record: &StringRecord, suffix: &str) -> CategoryScore {
    CategoryScore {
        total: cols.num(record, &format!("Total{suffix}")),
        max_possible: cols.num(record, &format!("Max_Possible{suffix}")),
        percent: cols.num(record, &format!("Percent{suffix}")),
        grade: cols.opt(record, &format!("Grade{suffix}")),
    }
}

/// Category suffixes present as `Total_<cat>` / `Grade_<cat>` / ... headers.
fn category_suffixes(headers: &StringRecord) -> BTreeSet<String> {
    headers
        .iter()
        .map(str::trim)
        .filter_map(|h| {
            AGGREGATE_PREFIXES
                .iter()
                .find_map(|prefix| h.strip_prefix(prefix)?.strip_prefix('_'))
        })
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

const IDENTITY_COLUMNS: &[&str] = &[
    "full_name",
    "party",
    "state",
    "chamber",
    "bioguide_id",
    "photo_url",
    "district",
    "birth_year",
    "age",
    "years_in_office",
    "office_phone",
    "office_address",
    "district_offices",
    "committees",
    "aipac_supported",
    "dmfi_supported",
    "reject_commitment",
    "reject_aipac_commitment",
    "reject_aipac_link",
];

fn looks_like_bill_column(header: &str) -> bool {
    !header.is_empty()
        && !IDENTITY_COLUMNS.contains(&header)
        && !AGGREGATE_PREFIXES
            .iter()
            .any(|p| header == *p || header.starts_with(&format!("{p}_")))
        && !["_absent", "_not_in_office", "_cosponsor"]
            .iter()
            .any(|s| header.ends_with(s))
}

/// Parse `pac_data.csv`. Cycle columns carry a `_<year>` suffix; unsuffixed columns are
/// read as the 2024 cycle.
pub fn parse_pac(text: &str) -> Result<HashMap<String, PacRecord>, CommonError> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(csv_error(PAC_FILE))?.clone();
    let cols = Columns::new(PAC_FILE, &headers);
    cols.require("bioguide_id")?;

    let mut out = HashMap::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error(PAC_FILE))?;
        let bioguide_id = cols.str(&record, "bioguide_id").to_string();
        if bioguide_id.is_empty() {
            continue;
        }
        let cycles = Cycle::ALL
            .into_iter()
            .map(|cycle| (cycle, cycle_funding(&cols, &record, cycle)))
            .collect();
        out.insert(
            bioguide_id.clone(),
            PacRecord {
                full_name: cols.str(&record, "full_name").to_string(),
                aipac_featured: cols.flag(&record, "aipac_featured"),
                dmfi_website: cols.flag(&record, "dmfi_website"),
                cycles,
                bioguide_id,
            },
        );
    }
    Ok(out)
}

fn cycle_funding(cols: &Columns<'_>, record: &StringRecord, cycle: Cycle) -> CycleFunding {
    let num = |base: &str| {
        cycle_field(cols, record, base, cycle)
            .and_then(parse_number)
            .unwrap_or(0.0)
    };
    let flag = |base: &str| {
        cycle_field(cols, record, base, cycle)
            .map(is_truthy)
            .unwrap_or(false)
    };

    CycleFunding {
        aipac: LobbyFunding {
            direct: num("aipac_direct_amount"),
            earmark: num("aipac_earmark_amount"),
            ie_support: num("aipac_ie_support"),
            ie_total: num("aipac_ie_total"),
            total: num("aipac_total"),
            supported: flag("aipac_supported"),
        },
        dmfi: LobbyFunding {
            direct: num("dmfi_direct"),
            earmark: num("dmfi_earmark_amount"),
            ie_support: num("dmfi_ie_support"),
            ie_total: num("dmfi_ie_total"),
            total: num("dmfi_total"),
            supported: flag("dmfi_supported"),
        },
    }
}

fn cycle_field<'r>(
    cols: &Columns<'_>,
    record: &'r StringRecord,
    base: &str,
    cycle: Cycle,
) -> Option<&'r str> {
    let suffixed = format!("{base}_{}", cycle.year());
    if cols.has(&suffixed) {
        return Some(cols.str(record, &suffixed));
    }
    (cycle == Cycle::Y2024 && cols.has(base)).then(|| cols.str(record, base))
}

/// Parse `manual_scoring_meta.csv` into labels keyed by bill label.
pub fn parse_manual_labels(text: &str) -> Result<HashMap<String, Vec<ManualLabel>>, CommonError> {
    let mut rdr = reader(text);
    let headers = rdr.headers().map_err(csv_error(MANUAL_LABELS_FILE))?.clone();
    let cols = Columns::new(MANUAL_LABELS_FILE, &headers);
    cols.require("label")?;
    cols.require("score")?;

    let mut out: HashMap<String, Vec<ManualLabel>> = HashMap::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error(MANUAL_LABELS_FILE))?;
        let label = cols.str(&record, "label").to_string();
        let Some(score) = cols.num(&record, "score") else {
            warn!(label = %label, "manual scoring label without a numeric score, skipping");
            continue;
        };
        out.entry(label.clone()).or_default().push(ManualLabel {
            description: cols.str(&record, "custom_scoring_description").to_string(),
            label,
            score,
        });
    }
    for labels in out.values_mut() {
        labels.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
    Ok(out)
}

/// Parse `graphic_sentences.csv`. Fields are positional:
/// chamber, columns, check_positive_points, good_text, bad_text, ending.
pub fn parse_sentence_rules(text: &str) -> Result<Vec<SentenceRule>, CommonError> {
    let mut rdr = reader(text);
    let mut out = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(csv_error(SENTENCES_FILE))?;
        if record.len() < 6 {
            continue;
        }
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");
        let Some(chamber) = Chamber::parse(field(0)) else {
            warn!(chamber = field(0), "sentence rule with unknown chamber, skipping");
            continue;
        };
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        out.push(SentenceRule {
            chamber,
            columns: split_list(field(1)),
            check_positive_points: field(2).eq_ignore_ascii_case("true"),
            good_text: non_empty(field(3)),
            bad_text: non_empty(field(4)),
            ending: field(5).to_string(),
        });
    }
    Ok(out)
}
