/// Decides whether a scored column applies to a member and which outcome bucket it falls in.
use serde::Serialize;

use crate::model::{BillKind, BillMeta, Dataset, Member, Position};
use crate::normalize::{infer_chamber, voted_in_both_chambers};

/// Score recorded for a "present" floor vote.
pub const PRESENT_SCORE: f64 = -1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Favorable,
    Unfavorable,
    Present,
    /// Credited through the preferred bill of the same pair; never counted against the member.
    Waived,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Classification {
    /// Other chamber, or nothing recorded.
    NotApplicable,
    /// Member was not in office for this action; omitted everywhere.
    NotInOffice,
    Scored {
        outcome: Outcome,
        /// Display-only: the member missed the vote.
        absent: bool,
    },
}

impl Classification {
    pub fn outcome(&self) -> Option<Outcome> {
        match self {
            Classification::Scored { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}

/// Chamber rule only: the bill belongs to the member's chamber, to no single
/// chamber, or was voted on in both.
pub fn applies_to_chamber(meta: &BillMeta, member: &Member) -> bool {
    match infer_chamber(Some(meta), &meta.column) {
        Some(chamber) if chamber != member.chamber => voted_in_both_chambers(meta),
        _ => true,
    }
}

pub fn classify(dataset: &Dataset, member: &Member, meta: &BillMeta) -> Classification {
    if !applies_to_chamber(meta, member) {
        return Classification::NotApplicable;
    }

    let cell = member.cell(&meta.column);
    if cell.not_in_office {
        return Classification::NotInOffice;
    }
    if cell.score.is_none() && (meta.kind == BillKind::Manual || cell.cosponsor.is_none()) {
        return Classification::NotApplicable;
    }

    let value = cell.score.unwrap_or(0.0);
    if is_waived(dataset, member, meta, value) {
        return Classification::Scored {
            outcome: Outcome::Waived,
            absent: false,
        };
    }

    let outcome = if meta.action_types.cosponsor {
        let favorable = match cell.cosponsor {
            Some(flag) => flag != (meta.position == Position::Oppose),
            None => value > 0.0,
        };
        if favorable {
            Outcome::Favorable
        } else {
            Outcome::Unfavorable
        }
    } else if meta.action_types.vote && value == PRESENT_SCORE {
        Outcome::Present
    } else if value > 0.0 {
        Outcome::Favorable
    } else {
        Outcome::Unfavorable
    };

    Classification::Scored {
        outcome,
        absent: cell.absent && !meta.action_types.cosponsor,
    }
}

fn is_waived(dataset: &Dataset, member: &Member, meta: &BillMeta, value: f64) -> bool {
    let Some(pair_key) = meta.pair_key.as_deref() else {
        return false;
    };
    if meta.preferred || value > 0.0 {
        return false;
    }
    dataset.bills().any(|other| {
        other.column != meta.column
            && other.preferred
            && other.pair_key.as_deref() == Some(pair_key)
            && member.score(&other.column).is_some_and(|v| v > 0.0)
    })
}

/// Short description of what the member did, for record listings.
pub fn action_text(meta: &BillMeta, outcome: Outcome, absent: bool) -> &'static str {
    let supportive = (outcome == Outcome::Favorable) != (meta.position == Position::Oppose);
    match outcome {
        Outcome::Waived => "Supported the preferred version",
        Outcome::Present => "Voted present",
        _ if absent => "Did not vote",
        _ if meta.kind == BillKind::Manual => {
            if outcome == Outcome::Favorable {
                "Took the favorable action"
            } else {
                "Did not take the favorable action"
            }
        }
        _ if meta.action_types.cosponsor => {
            if supportive {
                "Cosponsored"
            } else {
                "Has not cosponsored"
            }
        }
        _ if supportive => "Voted in favor",
        _ => "Voted against",
    }
}

/// Render points without a trailing ".0".
pub fn format_points(points: f64) -> String {
    if points.fract() == 0.0 {
        format!("{}", points as i64)
    } else {
        format!("{points:.1}")
    }
}

/// One applicable item in a member's record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordItem {
    pub column: String,
    pub label: String,
    pub bill_number: String,
    pub stance: Position,
    pub categories: Vec<String>,
    pub value: Option<f64>,
    pub points: f64,
    pub points_display: String,
    pub outcome: Outcome,
    pub absent: bool,
    pub action: &'static str,
}

/// Every applicable item for `member`, ordered by first category then label.
///
/// When `category` is given only bills tagged with it are listed.
pub fn member_record(dataset: &Dataset, member: &Member, category: Option<&str>) -> Vec<RecordItem> {
    let mut items: Vec<RecordItem> = dataset
        .bills()
        .filter(|meta| category.is_none_or(|c| meta.has_category(c)))
        .filter_map(|meta| {
            let Classification::Scored { outcome, absent } = classify(dataset, member, meta) else {
                return None;
            };
            let value = member.score(&meta.column);
            let earned = match outcome {
                Outcome::Favorable => value.unwrap_or(meta.points).max(0.0),
                _ => value.unwrap_or(0.0).max(0.0),
            };
            Some(RecordItem {
                column: meta.column.clone(),
                label: meta.label().to_string(),
                bill_number: meta.bill_number.clone(),
                stance: meta.position,
                categories: meta.categories.clone(),
                value,
                points: meta.points,
                points_display: format!("{} / {}", format_points(earned), format_points(meta.points)),
                outcome,
                absent,
                action: action_text(meta, outcome, absent),
            })
        })
        .collect();

    items.sort_by(|a, b| {
        let first = |i: &RecordItem| i.categories.first().map(|c| c.to_lowercase()).unwrap_or_default();
        first(a)
            .cmp(&first(b))
            .then_with(|| a.label.to_lowercase().cmp(&b.label.to_lowercase()))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fixtures::dataset;

    fn classify_by_id(ds: &Dataset, member: &str, column: &str) -> Classification {
        classify(ds, ds.member(member).unwrap(), ds.meta(column).unwrap())
    }

    #[test]
    fn other_chamber_is_not_applicable() {
        let ds = dataset();
        assert_eq!(classify_by_id(&ds, "A000001", "S1"), Classification::NotApplicable);
        assert_eq!(classify_by_id(&ds, "C000003", "HR1"), Classification::NotApplicable);
        for member in &ds.members {
            for meta in ds.bills() {
                let foreign = infer_chamber(Some(meta), &meta.column)
                    .is_some_and(|c| c != member.chamber);
                if foreign && !voted_in_both_chambers(meta) {
                    assert_eq!(classify(&ds, member, meta), Classification::NotApplicable);
                }
            }
        }
    }

    #[test]
    fn bicameral_bill_applies_to_both_chambers() {
        let ds = dataset();
        assert_eq!(
            classify_by_id(&ds, "C000003", "HR3").outcome(),
            Some(Outcome::Unfavorable)
        );
        assert_eq!(
            classify_by_id(&ds, "E000005", "HR3").outcome(),
            Some(Outcome::Favorable)
        );
    }

    #[test]
    fn not_in_office_is_excluded() {
        let ds = dataset();
        assert_eq!(classify_by_id(&ds, "B000002", "HR3"), Classification::NotInOffice);
        let record = member_record(&ds, ds.member("B000002").unwrap(), None);
        assert!(record.iter().all(|item| item.column != "HR3"));
    }

    #[test]
    fn waiver_through_preferred_bill() {
        let ds = dataset();
        assert_eq!(classify_by_id(&ds, "A000001", "HR2").outcome(), Some(Outcome::Waived));
        // Bob did not cosponsor the preferred bill either.
        assert_eq!(classify_by_id(&ds, "B000002", "HR2").outcome(), Some(Outcome::Unfavorable));
        // The preferred bill itself is never waived.
        assert_eq!(classify_by_id(&ds, "B000002", "HR1").outcome(), Some(Outcome::Unfavorable));
    }

    #[test]
    fn cosponsor_polarity_follows_position() {
        let mut ds = dataset();
        let hr2 = ds.meta_by_col.get_mut("HR2").unwrap();
        hr2.pair_key = None;
        hr2.position = Position::Oppose;
        assert_eq!(classify_by_id(&ds, "E000005", "HR2").outcome(), Some(Outcome::Unfavorable));
        assert_eq!(classify_by_id(&ds, "B000002", "HR2").outcome(), Some(Outcome::Favorable));
    }

    #[test]
    fn present_and_absent_votes() {
        let ds = dataset();
        assert_eq!(classify_by_id(&ds, "D000004", "HR3").outcome(), Some(Outcome::Present));
        assert_eq!(
            classify_by_id(&ds, "D000004", "S1"),
            Classification::Scored {
                outcome: Outcome::Unfavorable,
                absent: true
            }
        );
    }

    #[test]
    fn manual_without_score_is_not_applicable() {
        let ds = dataset();
        let mut cleared = ds.member("A000001").unwrap().clone();
        cleared.cells.get_mut("M1").unwrap().score = None;
        assert_eq!(
            classify(&ds, &cleared, ds.meta("M1").unwrap()),
            Classification::NotApplicable
        );
    }

    #[test]
    fn record_is_sorted_and_filterable() {
        let ds = dataset();
        let ann = ds.member("A000001").unwrap();
        let record = member_record(&ds, ann, None);
        let labels: Vec<&str> = record.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                "Sanctions Against ICC",
                "Iran War Powers",
                "Iran War Powers (Preferred)",
                "Travel Ban Markup"
            ]
        );
        assert_eq!(record[3].points_display, "10 / 10");
        assert_eq!(record[2].action, "Cosponsored");

        let iran_only = member_record(&ds, ann, Some("Iran"));
        assert_eq!(iran_only.len(), 3);
    }

    #[test]
    fn points_formatting() {
        assert_eq!(format_points(4.0), "4");
        assert_eq!(format_points(2.5), "2.5");
    }
}
