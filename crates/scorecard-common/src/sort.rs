/// Member-table ordering, decoded from `?sort=&dir=` next to the filters.
use std::cmp::Ordering;

use serde::{Deserialize, Deserializer};

use crate::classify::{classify, Classification};
use crate::filters::non_empty;
use crate::grades::grade_rank;
use crate::model::{Chamber, Cycle, Dataset, Member};
use crate::normalize::{category_field_suffix, state_code_of, state_name_of};
use crate::pac::{cycle_total, is_aipac_endorsed, is_dmfi_endorsed, rejects_support};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    /// Last name.
    Name,
    /// State name, senators before representatives, then district number.
    District,
    /// Overall grade, or the grade for `category` when given.
    Grade,
    /// Lobby relationship: rejects, none, both, AIPAC only, DMFI only.
    Lobby,
    /// Combined lobby dollars for `cycle`.
    Pac,
    /// Outcome on one scored column.
    Bill(String),
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "name" | "member" => Self::Name,
            "district" => Self::District,
            "grade" => Self::Grade,
            "lobby" | "aipac" => Self::Lobby,
            "pac" | "total_support" => Self::Pac,
            _ => Self::Bill(raw.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDir {
    /// Best first; A to Z for names and places; most dollars first.
    #[default]
    #[serde(alias = "asc")]
    GoodFirst,
    #[serde(alias = "desc")]
    BadFirst,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MemberSort {
    #[serde(default, deserialize_with = "sort_param")]
    pub sort: Option<SortKey>,
    #[serde(default)]
    pub dir: SortDir,
    #[serde(default, deserialize_with = "non_empty")]
    pub category: Option<String>,
    /// Defaults to the last completed cycle.
    #[serde(default)]
    pub cycle: Option<Cycle>,
}

fn sort_param<'de, D: Deserializer<'de>>(de: D) -> Result<Option<SortKey>, D::Error> {
    Ok(non_empty(de)?.map(|raw| SortKey::parse(&raw)))
}

impl MemberSort {
    /// Reorder `members` in place. Ties fall back to full name, A to Z.
    pub fn apply(&self, dataset: &Dataset, members: &mut [&Member]) {
        members.sort_by_cached_key(|m| m.sort_key());
        let Some(key) = &self.sort else {
            return;
        };
        let good_first = self.dir == SortDir::GoodFirst;
        let directed = |ord: Ordering| if good_first { ord } else { ord.reverse() };

        match key {
            SortKey::Name => {
                members.sort_by(|a, b| directed(last_name(&a.full_name).cmp(&last_name(&b.full_name))))
            }
            SortKey::District => members.sort_by(|a, b| {
                directed(state_label(a).cmp(&state_label(b)))
                    .then_with(|| compare_within_state(a, b, directed))
            }),
            SortKey::Grade => members.sort_by(|a, b| {
                let (grade_a, pct_a) = self.grade_of(a);
                let (grade_b, pct_b) = self.grade_of(b);
                directed(grade_rank(&grade_a).cmp(&grade_rank(&grade_b)))
                    .then_with(|| directed(pct_b.total_cmp(&pct_a)))
            }),
            SortKey::Lobby => {
                members.sort_by_key(|m| {
                    let rank = lobby_rank(dataset, m);
                    if good_first {
                        rank
                    } else {
                        u8::MAX - rank
                    }
                });
            }
            SortKey::Pac => {
                let cycle = self.cycle.unwrap_or_else(Cycle::last);
                let dollars = |m: &Member| cycle_total(dataset.pac_for(&m.bioguide_id), cycle);
                members.sort_by(|a, b| directed(dollars(*b).total_cmp(&dollars(*a))));
            }
            SortKey::Bill(column) => {
                let Some(meta) = dataset.meta(column) else {
                    return;
                };
                let outcome = |m: &Member| -> (u8, f64) {
                    match classify(dataset, m, meta) {
                        Classification::Scored { .. } => {
                            let score = m.score(column).unwrap_or(0.0);
                            let good = score > 0.0;
                            (if good == good_first { 0 } else { 1 }, score)
                        }
                        _ => (2, 0.0),
                    }
                };
                members.sort_by(|a, b| {
                    let (rank_a, score_a) = outcome(*a);
                    let (rank_b, score_b) = outcome(*b);
                    rank_a
                        .cmp(&rank_b)
                        .then_with(|| directed(score_b.total_cmp(&score_a)))
                });
            }
        }
    }

    fn grade_of(&self, member: &Member) -> (String, f64) {
        let score = match &self.category {
            Some(category) => member.category_scores.get(&category_field_suffix(category)),
            None => Some(&member.overall),
        };
        let grade = score.and_then(|s| s.grade.clone()).unwrap_or_default();
        let percent = score
            .and_then(|s| s.percent)
            .or(member.overall.percent)
            .unwrap_or(0.0);
        (grade, percent)
    }
}

/// "Last, First" uses the part before the comma; otherwise the final word.
fn last_name(full: &str) -> String {
    let full = full.trim();
    let last = match full.split_once(',') {
        Some((last, _)) => last.trim(),
        None => full.split_whitespace().last().unwrap_or(""),
    };
    last.replace(['.', ','], "").to_lowercase()
}

fn state_label(member: &Member) -> String {
    let code = state_code_of(&member.state);
    state_name_of(&code)
        .map(str::to_string)
        .unwrap_or(code)
}

fn compare_within_state(a: &Member, b: &Member, directed: impl Fn(Ordering) -> Ordering) -> Ordering {
    let district = |m: &Member| m.district.trim().parse::<f64>().unwrap_or(0.0);
    match (a.chamber, b.chamber) {
        (Chamber::Senate, Chamber::House) => Ordering::Less,
        (Chamber::House, Chamber::Senate) => Ordering::Greater,
        (Chamber::Senate, Chamber::Senate) => last_name(&a.full_name).cmp(&last_name(&b.full_name)),
        (Chamber::House, Chamber::House) => directed(district(a).total_cmp(&district(b)))
            .then_with(|| last_name(&a.full_name).cmp(&last_name(&b.full_name))),
    }
}

fn lobby_rank(dataset: &Dataset, member: &Member) -> u8 {
    let pac = dataset.pac_for(&member.bioguide_id);
    let aipac = is_aipac_endorsed(pac, member.aipac_supported.as_deref());
    let dmfi = is_dmfi_endorsed(pac, member.dmfi_supported.as_deref());
    match (rejects_support(member), aipac, dmfi) {
        (true, _, _) => 1,
        (false, false, false) => 2,
        (false, true, true) => 3,
        (false, true, false) => 4,
        (false, false, true) => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fixtures::dataset;

    fn order(ds: &Dataset, sort: &MemberSort) -> Vec<String> {
        let mut members: Vec<&Member> = ds.members.iter().collect();
        sort.apply(ds, &mut members);
        members.iter().map(|m| m.bioguide_id.clone()).collect()
    }

    fn sort_by(key: &str, dir: SortDir) -> MemberSort {
        MemberSort {
            sort: Some(SortKey::parse(key)),
            dir,
            ..Default::default()
        }
    }

    #[test]
    fn decodes_query() {
        let sort: MemberSort = serde_json::from_value(serde_json::json!({
            "sort": "grade",
            "dir": "desc",
            "category": "Iran",
            "cycle": "2026",
        }))
        .expect("valid sort");
        assert_eq!(sort.sort, Some(SortKey::Grade));
        assert_eq!(sort.dir, SortDir::BadFirst);
        assert_eq!(sort.cycle, Some(Cycle::Y2026));
        assert_eq!(SortKey::parse("HR1"), SortKey::Bill("HR1".to_string()));

        let sort: MemberSort = serde_json::from_value(serde_json::json!({ "sort": "" })).expect("valid sort");
        assert_eq!(sort, MemberSort::default());
    }

    #[test]
    fn last_names() {
        assert_eq!(last_name("Ann Alpha"), "alpha");
        assert_eq!(last_name("Smith, John"), "smith");
        assert_eq!(last_name("Robert Jones Jr."), "jr");
        assert_eq!(last_name(""), "");
    }

    #[test]
    fn unsorted_is_by_full_name() {
        let ds = dataset();
        assert_eq!(
            order(&ds, &MemberSort::default()),
            vec!["A000001", "B000002", "C000003", "D000004", "E000005"]
        );
    }

    #[test]
    fn by_last_name_both_ways() {
        let ds = dataset();
        let asc = order(&ds, &sort_by("name", SortDir::GoodFirst));
        assert_eq!(asc, vec!["A000001", "B000002", "D000004", "E000005", "C000003"]);
        let desc = order(&ds, &sort_by("name", SortDir::BadFirst));
        assert_eq!(desc, vec!["C000003", "E000005", "D000004", "B000002", "A000001"]);
    }

    #[test]
    fn grade_ties_break_on_percent() {
        let mut ds = dataset();
        for member in &mut ds.members {
            member.overall.percent = match member.bioguide_id.as_str() {
                "B000002" => Some(10.0),
                "D000004" => Some(20.0),
                _ => None,
            };
        }
        // Bob and Dan are both F; the higher percent wins when best comes first.
        let best = order(&ds, &sort_by("grade", SortDir::GoodFirst));
        assert_eq!(best, vec!["C000003", "A000001", "D000004", "B000002", "E000005"]);
        let worst = order(&ds, &sort_by("grade", SortDir::BadFirst));
        assert_eq!(worst, vec!["E000005", "B000002", "D000004", "A000001", "C000003"]);
    }

    #[test]
    fn category_grade() {
        let ds = dataset();
        let sort = MemberSort {
            category: Some("Israel/Gaza".to_string()),
            ..sort_by("grade", SortDir::GoodFirst)
        };
        let ids = order(&ds, &sort);
        assert_eq!(&ids[..2], ["C000003", "D000004"]);
    }

    #[test]
    fn district_senators_first() {
        let ds = dataset();
        // Eve has no state, so her empty label sorts first.
        let asc = order(&ds, &sort_by("district", SortDir::GoodFirst));
        assert_eq!(asc, vec!["E000005", "A000001", "D000004", "C000003", "B000002"]);
        let desc = order(&ds, &sort_by("district", SortDir::BadFirst));
        assert_eq!(desc, vec!["D000004", "C000003", "B000002", "A000001", "E000005"]);
    }

    #[test]
    fn house_districts_in_number_order() {
        let mut ds = dataset();
        ds.members[0].state = "OH".to_string();
        let asc = order(&ds, &sort_by("district", SortDir::GoodFirst));
        assert_eq!(&asc[1..], ["D000004", "C000003", "B000002", "A000001"]);
        let desc = order(&ds, &sort_by("district", SortDir::BadFirst));
        assert_eq!(&desc[..4], ["D000004", "C000003", "A000001", "B000002"]);
    }

    #[test]
    fn lobby_priority() {
        let ds = dataset();
        let best = order(&ds, &sort_by("lobby", SortDir::GoodFirst));
        assert_eq!(&best[..3], ["C000003", "A000001", "E000005"]);
        let worst = order(&ds, &sort_by("lobby", SortDir::BadFirst));
        assert_eq!(worst, vec!["B000002", "D000004", "A000001", "E000005", "C000003"]);
    }

    #[test]
    fn pac_dollars_by_cycle() {
        let ds = dataset();
        let last = order(&ds, &sort_by("pac", SortDir::GoodFirst));
        assert_eq!(last[0], "B000002");
        let next = MemberSort {
            cycle: Some(Cycle::Y2026),
            ..sort_by("pac", SortDir::GoodFirst)
        };
        assert_eq!(order(&ds, &next), vec!["D000004", "A000001", "B000002", "C000003", "E000005"]);
    }

    #[test]
    fn bill_outcome_with_ineligible_last() {
        let ds = dataset();
        // Bob had left office before HR3.
        let best = order(&ds, &sort_by("HR3", SortDir::GoodFirst));
        assert_eq!(best, vec!["E000005", "A000001", "C000003", "D000004", "B000002"]);
        let worst = order(&ds, &sort_by("HR3", SortDir::BadFirst));
        assert_eq!(worst, vec!["D000004", "A000001", "C000003", "E000005", "B000002"]);

        let unknown = order(&ds, &sort_by("HR99", SortDir::GoodFirst));
        assert_eq!(unknown, order(&ds, &MemberSort::default()));
    }
}
