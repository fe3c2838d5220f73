/// Pure string → canonical-code helpers shared by every view.
use std::sync::LazyLock;

use regex::Regex;

use crate::model::{BillMeta, Chamber};

const STATES: &[(&str, &str, &str)] = &[
    ("AL", "Alabama", "01"),
    ("AK", "Alaska", "02"),
    ("AZ", "Arizona", "04"),
    ("AR", "Arkansas", "05"),
    ("CA", "California", "06"),
    ("CO", "Colorado", "08"),
    ("CT", "Connecticut", "09"),
    ("DE", "Delaware", "10"),
    ("DC", "District of Columbia", "11"),
    ("FL", "Florida", "12"),
    ("GA", "Georgia", "13"),
    ("HI", "Hawaii", "15"),
    ("ID", "Idaho", "16"),
    ("IL", "Illinois", "17"),
    ("IN", "Indiana", "18"),
    ("IA", "Iowa", "19"),
    ("KS", "Kansas", "20"),
    ("KY", "Kentucky", "21"),
    ("LA", "Louisiana", "22"),
    ("ME", "Maine", "23"),
    ("MD", "Maryland", "24"),
    ("MA", "Massachusetts", "25"),
    ("MI", "Michigan", "26"),
    ("MN", "Minnesota", "27"),
    ("MS", "Mississippi", "28"),
    ("MO", "Missouri", "29"),
    ("MT", "Montana", "30"),
    ("NE", "Nebraska", "31"),
    ("NV", "Nevada", "32"),
    ("NH", "New Hampshire", "33"),
    ("NJ", "New Jersey", "34"),
    ("NM", "New Mexico", "35"),
    ("NY", "New York", "36"),
    ("NC", "North Carolina", "37"),
    ("ND", "North Dakota", "38"),
    ("OH", "Ohio", "39"),
    ("OK", "Oklahoma", "40"),
    ("OR", "Oregon", "41"),
    ("PA", "Pennsylvania", "42"),
    ("RI", "Rhode Island", "44"),
    ("SC", "South Carolina", "45"),
    ("SD", "South Dakota", "46"),
    ("TN", "Tennessee", "47"),
    ("TX", "Texas", "48"),
    ("UT", "Utah", "49"),
    ("VT", "Vermont", "50"),
    ("VA", "Virginia", "51"),
    ("WA", "Washington", "53"),
    ("WV", "West Virginia", "54"),
    ("WI", "Wisconsin", "55"),
    ("WY", "Wyoming", "56"),
    ("AS", "American Samoa", "60"),
    ("GU", "Guam", "66"),
    ("MP", "Northern Mariana Islands", "69"),
    ("PR", "Puerto Rico", "72"),
    ("VI", "U.S. Virgin Islands", "78"),
];

static CATEGORY_AMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+&\s+").expect("valid regex"));
static CATEGORY_SEP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[/-]").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Canonical two-letter code for a state code or full state name.
///
/// Unrecognized input is upper-cased and passed through unvalidated.
pub fn state_code_of(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    STATES
        .iter()
        .find(|(code, name, _)| {
            code.eq_ignore_ascii_case(raw) || name.eq_ignore_ascii_case(raw)
        })
        .map(|(code, _, _)| code.to_string())
        .unwrap_or_else(|| raw.to_uppercase())
}

pub fn state_name_of(code: &str) -> Option<&'static str> {
    STATES
        .iter()
        .find(|(c, _, _)| c.eq_ignore_ascii_case(code.trim()))
        .map(|(_, name, _)| *name)
}

pub fn is_known_state(code: &str) -> bool {
    state_name_of(code).is_some()
}

/// Two-digit census FIPS code (e.g. "39") → state code.
pub fn state_code_from_fips(fips: &str) -> Option<&'static str> {
    let fips = fips.trim();
    STATES
        .iter()
        .find(|(_, _, f)| *f == fips)
        .map(|(code, _, _)| *code)
}

pub fn party_label(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    if raw.to_lowercase().starts_with("democ") {
        return "Democrat".to_string();
    }
    raw.split_whitespace()
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Chamber a bill belongs to, or `None` for bicameral / indeterminate bills.
pub fn infer_chamber(meta: Option<&BillMeta>, column: &str) -> Option<Chamber> {
    let meta = meta?;
    if let Some(explicit) = meta.explicit_chamber.as_deref().map(str::trim) {
        if let Some(chamber) = Chamber::parse(explicit) {
            return Some(chamber);
        }
        if explicit.is_empty() {
            return None;
        }
    }

    let id = if meta.bill_number.trim().is_empty() {
        column.trim()
    } else {
        meta.bill_number.trim()
    };
    if id.starts_with('H') {
        Some(Chamber::House)
    } else if id.starts_with('S') {
        Some(Chamber::Senate)
    } else {
        None
    }
}

/// `vote_tallies` records floor votes in both chambers.
pub fn voted_in_both_chambers(meta: &BillMeta) -> bool {
    let tallies = meta.vote_tallies.to_lowercase();
    tallies.contains("house") && tallies.contains("senate")
}

/// CSV truthiness: "1", "true", "yes", or any non-zero number.
pub fn is_truthy(raw: &str) -> bool {
    let s = raw.trim().to_lowercase();
    if matches!(s.as_str(), "true" | "yes" | "1") {
        return true;
    }
    s.parse::<f64>().map(|n| n != 0.0).unwrap_or(false)
}

/// Field suffix used by `Total_<cat>` / `Grade_<cat>` columns,
/// e.g. "Civil Rights & Immigration" → "Civil_Rights_Immigration".
pub fn category_field_suffix(category: &str) -> String {
    let s = CATEGORY_AMP_RE.replace_all(category.trim(), "_");
    let s = CATEGORY_SEP_RE.replace_all(&s, "_");
    WHITESPACE_RE.replace_all(&s, "_").into_owned()
}

/// Split a `;`-delimited cell into trimmed, non-empty parts.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn chamber_title(chamber: Chamber) -> &'static str {
    match chamber {
        Chamber::House => "Representative",
        Chamber::Senate => "Senator",
    }
}
