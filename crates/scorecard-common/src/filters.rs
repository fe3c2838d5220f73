/// Request-scoped filter selection, decoded from the query string.
use serde::{Deserialize, Deserializer, Serialize};

use crate::model::{BillMeta, Chamber, Member};
use crate::normalize::{infer_chamber, party_label, state_code_of, voted_in_both_chambers};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    #[serde(default, deserialize_with = "chamber_param")]
    pub chamber: Option<Chamber>,
    #[serde(default, deserialize_with = "non_empty")]
    pub party: Option<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub state: Option<String>,
    /// `?categories=Iran,Israel/Gaza`
    #[serde(default, deserialize_with = "comma_list")]
    pub categories: Vec<String>,
    #[serde(default, deserialize_with = "non_empty")]
    pub search: Option<String>,
    /// `?action_type=vote|cosponsor`, bills only.
    #[serde(default, deserialize_with = "action_param")]
    pub action_type: Option<ActionKind>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Vote,
    Cosponsor,
}

impl ActionKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "vote" => Some(Self::Vote),
            "cosponsor" => Some(Self::Cosponsor),
            _ => None,
        }
    }
}

impl Filters {
    /// Select `category` if unselected, otherwise deselect it.
    pub fn toggle_category(&mut self, category: &str) {
        match self.categories.iter().position(|c| c == category) {
            Some(i) => {
                self.categories.remove(i);
            }
            None => self.categories.push(category.to_string()),
        }
    }

    pub fn matches_member(&self, member: &Member) -> bool {
        if self.chamber.is_some_and(|c| c != member.chamber) {
            return false;
        }
        if let Some(party) = &self.party {
            if party_label(party) != party_label(&member.party) {
                return false;
            }
        }
        if let Some(state) = &self.state {
            if state_code_of(state) != state_code_of(&member.state) {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            let found = member.full_name.to_lowercase().contains(&needle)
                || member.bioguide_id.to_lowercase() == needle
                || state_code_of(&member.state).eq_ignore_ascii_case(&needle);
            if !found {
                return false;
            }
        }
        true
    }

    /// Category selection is a union: any selected category matches.
    pub fn matches_bill(&self, meta: &BillMeta) -> bool {
        if !self.categories.is_empty() && !self.categories.iter().any(|c| meta.has_category(c)) {
            return false;
        }
        match self.action_type {
            Some(ActionKind::Vote) if !meta.action_types.vote => return false,
            Some(ActionKind::Cosponsor) if !meta.action_types.cosponsor => return false,
            _ => {}
        }
        match (self.chamber, infer_chamber(Some(meta), &meta.column)) {
            (Some(wanted), Some(chamber)) if wanted != chamber => voted_in_both_chambers(meta),
            _ => true,
        }
    }
}

pub(crate) fn non_empty<'de, D: Deserializer<'de>>(de: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(de)?;
    Ok(raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

fn chamber_param<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Chamber>, D::Error> {
    match non_empty(de)? {
        None => Ok(None),
        Some(raw) => Chamber::parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown chamber: {raw}"))),
    }
}

fn action_param<'de, D: Deserializer<'de>>(de: D) -> Result<Option<ActionKind>, D::Error> {
    match non_empty(de)? {
        None => Ok(None),
        Some(raw) => ActionKind::parse(&raw)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown action type: {raw}"))),
    }
}

fn comma_list<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<String>, D::Error> {
    Ok(non_empty(de)?
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::fixtures::dataset;

    fn from_json(value: serde_json::Value) -> Filters {
        serde_json::from_value(value).expect("valid filters")
    }

    #[test]
    fn decodes_query_shapes() {
        let filters = from_json(serde_json::json!({
            "chamber": "senate",
            "party": "",
            "categories": "Iran, Israel/Gaza,,",
        }));
        assert_eq!(filters.chamber, Some(Chamber::Senate));
        assert_eq!(filters.party, None);
        assert_eq!(filters.categories, vec!["Iran", "Israel/Gaza"]);

        let err = serde_json::from_value::<Filters>(serde_json::json!({ "chamber": "governor" }));
        assert!(err.is_err());
        assert_eq!(from_json(serde_json::json!({})), Filters::default());
    }

    #[test]
    fn toggles_categories() {
        let mut filters = Filters::default();
        filters.toggle_category("Iran");
        filters.toggle_category("Israel/Gaza");
        filters.toggle_category("Iran");
        assert_eq!(filters.categories, vec!["Israel/Gaza"]);
    }

    #[test]
    fn member_matching() {
        let ds = dataset();
        let ids = |filters: &Filters| -> Vec<String> {
            ds.members
                .iter()
                .filter(|m| filters.matches_member(m))
                .map(|m| m.bioguide_id.clone())
                .collect()
        };

        let ohio = Filters {
            state: Some("ohio".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&ohio), vec!["B000002", "C000003", "D000004"]);

        let democrats = Filters {
            party: Some("democratic".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&democrats), vec!["A000001", "C000003"]);

        let search = Filters {
            search: Some("beta".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&search), vec!["B000002"]);
    }

    #[test]
    fn bill_matching() {
        let ds = dataset();
        let senate_iran = Filters {
            chamber: Some(Chamber::Senate),
            categories: vec!["Iran".to_string(), "Civil Rights & Immigration".to_string()],
            ..Default::default()
        };
        let columns: Vec<&str> = ds
            .bills()
            .filter(|b| senate_iran.matches_bill(b))
            .map(|b| b.column.as_str())
            .collect();
        assert_eq!(columns, vec!["HR3"]);
    }

    #[test]
    fn bill_matching_by_action_type() {
        let ds = dataset();
        let columns = |filters: &Filters| -> Vec<String> {
            ds.bills()
                .filter(|b| filters.matches_bill(b))
                .map(|b| b.column.clone())
                .collect()
        };

        let cosponsor = from_json(serde_json::json!({ "action_type": "Cosponsor" }));
        assert_eq!(cosponsor.action_type, Some(ActionKind::Cosponsor));
        assert_eq!(columns(&cosponsor), vec!["HR1", "HR2"]);

        let house_votes = from_json(serde_json::json!({ "action_type": "vote", "chamber": "house" }));
        assert_eq!(columns(&house_votes), vec!["HR3"]);

        assert_eq!(from_json(serde_json::json!({ "action_type": "" })).action_type, None);
        let err = serde_json::from_value::<Filters>(serde_json::json!({ "action_type": "amend" }));
        assert!(err.is_err());
    }
}
