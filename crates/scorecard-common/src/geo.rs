/// Map aggregation: House members by district, Senate members by state.
use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::group::{BillGrouping, Tone};
use crate::model::{Chamber, Member, PacRecord};
use crate::normalize::{is_known_state, state_code_of};
use crate::pac::{support_status, SupportStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MapTone {
    Favorable,
    Unfavorable,
    /// Members of the same region fall in different buckets.
    Split,
}

#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub tone: MapTone,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Legend {
    pub favorable: usize,
    pub unfavorable: usize,
    pub split: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GeoMap {
    /// Keyed `ST-DD`, at-large districts as `00`.
    pub districts: BTreeMap<String, Region>,
    /// Keyed by state code.
    pub states: BTreeMap<String, Region>,
    pub legend: Legend,
}

impl GeoMap {
    fn place(&mut self, member: &Member, tone: MapTone) {
        let state = state_code_of(&member.state);
        if !is_known_state(&state) {
            return;
        }
        let (regions, key) = match member.chamber {
            Chamber::Senate => (&mut self.states, state),
            Chamber::House => match district_number(&member.district) {
                Some(district) => (&mut self.districts, format!("{state}-{district}")),
                None => return,
            },
        };
        let region = regions.entry(key).or_insert_with(|| Region {
            tone,
            members: Vec::new(),
        });
        if region.tone != tone {
            region.tone = MapTone::Split;
        }
        region.members.push(member.bioguide_id.clone());
    }

    fn finish(mut self) -> Self {
        let mut legend = Legend::default();
        for region in self.districts.values().chain(self.states.values()) {
            match region.tone {
                MapTone::Favorable => legend.favorable += 1,
                MapTone::Unfavorable => legend.unfavorable += 1,
                MapTone::Split => legend.split += 1,
            }
        }
        self.legend = legend;
        self
    }
}

/// Two-digit district, `00` for at-large; `None` when the value is malformed.
pub fn district_number(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty()
        || raw.eq_ignore_ascii_case("AL")
        || raw.eq_ignore_ascii_case("at-large")
        || raw.eq_ignore_ascii_case("at large")
    {
        return Some("00".to_string());
    }
    let n = match raw.parse::<u8>() {
        Ok(n) => n,
        // Spreadsheet exports write "3.0".
        Err(_) => raw
            .parse::<f64>()
            .ok()
            .filter(|n| n.fract() == 0.0 && (0.0..=f64::from(u8::MAX)).contains(n))? as u8,
    };
    Some(format!("{n:02}"))
}

/// Color regions by the members' favorable / unfavorable sections on one bill.
///
/// Partial, present and waived members are left off the map. Members whose state or district
/// cannot be resolved are skipped.
pub fn aggregate_geography(grouping: &BillGrouping, members: &[Member]) -> GeoMap {
    let by_id: HashMap<&str, &Member> = members.iter().map(|m| (m.bioguide_id.as_str(), m)).collect();
    let mut map = GeoMap::default();
    for section in &grouping.sections {
        let tone = match section.tone {
            Tone::Favorable => MapTone::Favorable,
            Tone::Unfavorable => MapTone::Unfavorable,
            Tone::Partial | Tone::Neutral => continue,
        };
        for entry in &section.members {
            if let Some(member) = by_id.get(entry.bioguide_id.as_str()) {
                map.place(member, tone);
            }
        }
    }
    map.finish()
}

/// Color regions by lobby support: supported members are unfavorable, everyone else favorable.
pub fn aggregate_endorsements(members: &[Member], pac: &HashMap<String, PacRecord>) -> GeoMap {
    let mut map = GeoMap::default();
    for member in members {
        let tone = match support_status(member, pac.get(&member.bioguide_id)) {
            SupportStatus::Supported => MapTone::Unfavorable,
            SupportStatus::Rejects | SupportStatus::NoKnownSupport => MapTone::Favorable,
        };
        map.place(member, tone);
    }
    map.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::Filters;
    use crate::group::group_bill;
    use crate::loader::fixtures::dataset;

    #[test]
    fn split_senate_state() {
        let ds = dataset();
        // Cat voted for S1; Dan missed the vote, which still counts as opposed.
        let grouping = group_bill(&ds, "S1", &Filters::default()).unwrap();
        let map = aggregate_geography(&grouping, &ds.members);

        let ohio = &map.states["OH"];
        assert_eq!(ohio.tone, MapTone::Split);
        assert_eq!(ohio.members, vec!["C000003", "D000004"]);
        assert!(map.districts.is_empty());
        assert_eq!(
            map.legend,
            Legend {
                favorable: 0,
                unfavorable: 0,
                split: 1
            }
        );
    }

    #[test]
    fn bicameral_bill_fills_both_maps() {
        let ds = dataset();
        let grouping = group_bill(&ds, "HR3", &Filters::default()).unwrap();
        let map = aggregate_geography(&grouping, &ds.members);

        // Ann (CA-12) scored zero, Eve has no state and Dan voted present.
        assert_eq!(map.districts.keys().collect::<Vec<_>>(), vec!["CA-12"]);
        assert_eq!(map.districts["CA-12"].tone, MapTone::Unfavorable);
        assert_eq!(map.states.keys().collect::<Vec<_>>(), vec!["OH"]);
        assert_eq!(map.states["OH"].members, vec!["C000003"]);
    }

    #[test]
    fn districts() {
        assert_eq!(district_number("3").as_deref(), Some("03"));
        assert_eq!(district_number("12").as_deref(), Some("12"));
        assert_eq!(district_number("AL").as_deref(), Some("00"));
        assert_eq!(district_number("").as_deref(), Some("00"));
        assert_eq!(district_number("0").as_deref(), Some("00"));
        assert_eq!(district_number("third"), None);
        assert_eq!(district_number("3.0").as_deref(), Some("03"));
        assert_eq!(district_number(" 12.0 ").as_deref(), Some("12"));
        assert_eq!(district_number("3.5"), None);
        assert_eq!(district_number("-1"), None);
    }

    #[test]
    fn float_districts_stay_on_the_map() {
        let mut ds = dataset();
        ds.members[0].district = "12.0".to_string();
        let grouping = group_bill(&ds, "HR3", &Filters::default()).unwrap();
        let map = aggregate_geography(&grouping, &ds.members);
        assert_eq!(map.districts.keys().collect::<Vec<_>>(), vec!["CA-12"]);
    }

    #[test]
    fn endorsement_map() {
        let ds = dataset();
        let map = aggregate_endorsements(&ds.members, &ds.pac);
        assert_eq!(map.districts["OH-03"].tone, MapTone::Unfavorable);
        assert_eq!(map.districts["CA-12"].tone, MapTone::Favorable);
        // Cat rejects support, Dan took money for 2026.
        assert_eq!(map.states["OH"].tone, MapTone::Split);
    }
}
