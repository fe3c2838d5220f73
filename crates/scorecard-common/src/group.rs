/// Per-bill member groupings and per-category grade display.
use serde::Serialize;

use crate::classify::{classify, format_points, Classification, Outcome};
use crate::filters::Filters;
use crate::grades::grade_color;
use crate::model::{BillKind, BillMeta, CategoryScore, Chamber, Dataset, Member, Position};
use crate::normalize::{category_field_suffix, infer_chamber};

pub const NOT_AVAILABLE: &str = "N/A";
pub const EMPTY_GROUPING_MESSAGE: &str = "No lawmakers match the current filters for this item.";

/// Display grade for one category, read from the precomputed `Grade_<cat>` fields.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGrade {
    pub category: String,
    pub grade: String,
    pub color: &'static str,
    pub total: Option<f64>,
    pub max_possible: Option<f64>,
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberGrades {
    pub overall: CategoryGrade,
    pub categories: Vec<CategoryGrade>,
}

pub fn category_grades(member: &Member, categories: &[String]) -> MemberGrades {
    let grade_of = |category: &str, score: Option<&CategoryScore>| {
        let grade = score
            .and_then(|s| s.grade.clone())
            .filter(|g| !g.is_empty())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());
        CategoryGrade {
            category: category.to_string(),
            color: grade_color(&grade),
            total: score.and_then(|s| s.total),
            max_possible: score.and_then(|s| s.max_possible),
            percent: score.and_then(|s| s.percent),
            grade,
        }
    };

    MemberGrades {
        overall: grade_of("Overall", Some(&member.overall)),
        categories: categories
            .iter()
            .map(|c| grade_of(c, member.category_scores.get(&category_field_suffix(c))))
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Favorable,
    Unfavorable,
    Partial,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupedMember {
    pub bioguide_id: String,
    pub full_name: String,
    pub party: String,
    pub chamber: Chamber,
    pub state: String,
    pub district: String,
    pub score: Option<f64>,
    pub absent: bool,
    pub sponsor: bool,
}

impl GroupedMember {
    fn new(member: &Member, column: &str, absent: bool) -> Self {
        Self {
            bioguide_id: member.bioguide_id.clone(),
            full_name: member.full_name.clone(),
            party: member.party.clone(),
            chamber: member.chamber,
            state: member.state.clone(),
            district: member.district.clone(),
            score: member.score(column),
            absent,
            sponsor: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub label: String,
    pub tone: Tone,
    /// Bucket score for multi-way manual groupings.
    pub score: Option<f64>,
    /// Highest observed manual score.
    pub best: bool,
    pub description: Option<String>,
    pub members: Vec<GroupedMember>,
}

impl Section {
    fn new(label: impl Into<String>, tone: Tone) -> Self {
        Self {
            label: label.into(),
            tone,
            score: None,
            best: false,
            description: None,
            members: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillGrouping {
    pub column: String,
    pub label: String,
    pub chamber: Option<Chamber>,
    pub multi_way: bool,
    pub sections: Vec<Section>,
    pub empty_message: Option<&'static str>,
}

impl BillGrouping {
    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.members.is_empty())
    }

    /// Number of members in sections with the given tone.
    pub fn count(&self, tone: Tone) -> usize {
        self.sections
            .iter()
            .filter(|s| s.tone == tone)
            .map(|s| s.members.len())
            .sum()
    }
}

/// Group the members matching `filters` by their outcome on `column`.
///
/// Returns `None` for an unknown column. A filter that leaves nobody produces an empty
/// grouping with a message rather than an error.
pub fn group_bill(dataset: &Dataset, column: &str, filters: &Filters) -> Option<BillGrouping> {
    let meta = dataset.meta(column)?;

    let mut members: Vec<&Member> = dataset
        .members
        .iter()
        .filter(|m| filters.matches_member(m))
        .collect();
    members.sort_by_cached_key(|m| m.sort_key());

    // The sponsor is never marked as their own cosponsor; they head the cosponsor list instead.
    let sponsor = if meta.action_types.cosponsor && meta.kind != BillKind::Manual {
        resolve_sponsor(meta, &members)
    } else {
        None
    };

    let classified: Vec<(&Member, Outcome, bool)> = members
        .iter()
        .copied()
        .filter(|m| sponsor.map_or(true, |s| s.bioguide_id != m.bioguide_id))
        .filter_map(|m| match classify(dataset, m, meta) {
            Classification::Scored { outcome, absent } => Some((m, outcome, absent)),
            _ => None,
        })
        .collect();

    let mut distinct: Vec<f64> = classified
        .iter()
        .filter(|(_, outcome, _)| *outcome != Outcome::Waived)
        .filter_map(|(m, _, _)| m.score(column))
        .collect();
    distinct.sort_by(|a, b| b.total_cmp(a));
    distinct.dedup();

    let multi_way = meta.kind == BillKind::Manual && distinct.len() > 2;
    let mut sections = if multi_way {
        manual_sections(dataset, meta, &distinct, &classified)
    } else {
        binary_sections(meta, &classified, sponsor)
    };

    let waived: Vec<GroupedMember> = classified
        .iter()
        .filter(|(_, outcome, _)| *outcome == Outcome::Waived)
        .map(|(m, _, absent)| GroupedMember::new(m, column, *absent))
        .collect();
    if !waived.is_empty() {
        let mut section = Section::new("Supported the preferred version", Tone::Neutral);
        section.members = waived;
        sections.push(section);
    }

    let mut grouping = BillGrouping {
        column: meta.column.clone(),
        label: meta.label().to_string(),
        chamber: infer_chamber(Some(meta), &meta.column),
        multi_way,
        sections,
        empty_message: None,
    };
    if grouping.is_empty() {
        grouping.empty_message = Some(EMPTY_GROUPING_MESSAGE);
    }
    Some(grouping)
}

/// Find the sponsor among `members`: by bioguide id, then by name, then by the free-form
/// `sponsor` field read as an id or a name.
pub fn resolve_sponsor<'a>(meta: &BillMeta, members: &[&'a Member]) -> Option<&'a Member> {
    let by_id = |id: &str| members.iter().copied().find(|m| m.bioguide_id == id);
    let by_name = |name: &str| {
        let needle = name.to_lowercase();
        members.iter().copied().find(|m| {
            let full = m.full_name.trim().to_lowercase();
            !full.is_empty() && (full.contains(&needle) || needle.contains(&full))
        })
    };

    if let Some(id) = meta.sponsor_bioguide_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        return by_id(id);
    }
    let name = meta.sponsor_name.trim();
    if !name.is_empty() {
        return by_name(name);
    }
    let sponsor = meta.sponsor.trim();
    if sponsor.is_empty() {
        return None;
    }
    by_id(sponsor).or_else(|| by_name(sponsor))
}

fn binary_sections(
    meta: &BillMeta,
    classified: &[(&Member, Outcome, bool)],
    sponsor: Option<&Member>,
) -> Vec<Section> {
    let opposed = meta.position == Position::Oppose;
    let (favorable_label, unfavorable_label) = if meta.action_types.cosponsor {
        if opposed {
            ("Has not cosponsored", "Cosponsors")
        } else {
            ("Cosponsors", "Has not cosponsored")
        }
    } else if opposed {
        ("Voted against", "Voted in favor")
    } else {
        ("Voted in favor", "Voted against")
    };

    let mut favorable = Section::new(favorable_label, Tone::Favorable);
    let mut unfavorable = Section::new(unfavorable_label, Tone::Unfavorable);
    let mut present = Section::new("Voted Present", Tone::Neutral);

    for (member, outcome, absent) in classified {
        let entry = GroupedMember::new(member, &meta.column, *absent);
        match outcome {
            Outcome::Favorable => favorable.members.push(entry),
            Outcome::Unfavorable => unfavorable.members.push(entry),
            Outcome::Present => present.members.push(entry),
            Outcome::Waived => {}
        }
    }

    if let Some(sponsor) = sponsor {
        let cosponsors = if opposed { &mut unfavorable } else { &mut favorable };
        let mut entry = GroupedMember::new(sponsor, &meta.column, false);
        entry.sponsor = true;
        cosponsors.members.insert(0, entry);
    }

    let mut sections = vec![favorable, unfavorable];
    if !present.members.is_empty() {
        sections.push(present);
    }
    sections
}

fn manual_sections(
    dataset: &Dataset,
    meta: &BillMeta,
    distinct: &[f64],
    classified: &[(&Member, Outcome, bool)],
) -> Vec<Section> {
    distinct
        .iter()
        .enumerate()
        .map(|(i, &score)| {
            let best = i == 0;
            let tone = if best || score >= meta.points {
                Tone::Favorable
            } else if score <= 0.0 {
                Tone::Unfavorable
            } else {
                Tone::Partial
            };
            let custom = dataset.manual_label(meta.label(), score);
            let label = custom
                .map(|l| l.description.clone())
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Score: {}", format_points(score)));

            let mut section = Section::new(label, tone);
            section.score = Some(score);
            section.best = best;
            section.description = custom.map(|l| l.description.clone());
            section.members = classified
                .iter()
                .filter(|(m, outcome, _)| {
                    *outcome != Outcome::Waived && m.score(&meta.column) == Some(score)
                })
                .map(|(m, _, absent)| GroupedMember::new(m, &meta.column, *absent))
                .collect();
            section
        })
        .collect()
}
