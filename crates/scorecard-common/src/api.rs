use serde::{Deserialize, Serialize};

use crate::classify::{member_record, RecordItem};
use crate::dates::format_date;
use crate::filters::Filters;
use crate::geo::{aggregate_endorsements, aggregate_geography, GeoMap};
use crate::grades::grade_color;
use crate::group::{category_grades, group_bill, BillGrouping, MemberGrades, NOT_AVAILABLE};
use crate::model::{ActionTypes, BillKind, BillMeta, Chamber, Cycle, Dataset, Member, Position};
use crate::normalize::{chamber_title, infer_chamber, party_label, state_code_of, state_name_of};
use crate::pac::{cycle_total, lobby_summary, LobbySummary, SupportStatus};
use crate::sentences::{generate_sentences, Sentence};
use crate::sort::MemberSort;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub dataset_version: Option<String>,
    pub members: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberSummary {
    pub bioguide_id: String,
    pub full_name: String,
    pub party: String,
    pub chamber: Chamber,
    pub title: &'static str,
    pub state: String,
    pub state_name: Option<&'static str>,
    pub district: String,
    /// "OH-03" for representatives, "OH" for senators.
    pub location: String,
    pub photo_url: Option<String>,
    pub grade: String,
    pub grade_color: &'static str,
    pub total: Option<f64>,
    pub max_possible: Option<f64>,
}

pub fn member_summary(member: &Member) -> MemberSummary {
    let state = state_code_of(&member.state);
    let grade = member
        .overall
        .grade
        .clone()
        .filter(|g| !g.is_empty())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    MemberSummary {
        bioguide_id: member.bioguide_id.clone(),
        full_name: member.full_name.clone(),
        party: party_label(&member.party),
        chamber: member.chamber,
        title: chamber_title(member.chamber),
        state_name: state_name_of(&state),
        district: member.district.clone(),
        location: location(member.chamber, &state, &member.district),
        photo_url: member.photo_url.clone(),
        grade_color: grade_color(&grade),
        grade,
        total: member.overall.total,
        max_possible: member.overall.max_possible,
        state,
    }
}

fn location(chamber: Chamber, state: &str, district: &str) -> String {
    let district = district.trim();
    match chamber {
        Chamber::House if !district.is_empty() => format!("{state}-{district}"),
        _ => state.to_string(),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberListResponse {
    pub count: usize,
    pub members: Vec<MemberSummary>,
}

/// Members matching `filters` in `sort` order; by name when no sort is chosen.
pub fn member_list(dataset: &Dataset, filters: &Filters, sort: &MemberSort) -> MemberListResponse {
    let mut members: Vec<&Member> = dataset
        .members
        .iter()
        .filter(|m| filters.matches_member(m))
        .collect();
    sort.apply(dataset, &mut members);
    let members: Vec<MemberSummary> = members.into_iter().map(member_summary).collect();
    MemberListResponse {
        count: members.len(),
        members,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub summary: MemberSummary,
    pub age: Option<u16>,
    pub birth_year: Option<u16>,
    pub years_in_office: Option<f64>,
    pub office_phone: Option<String>,
    pub office_address: Option<String>,
    pub district_offices: Vec<String>,
    pub committees: Vec<String>,
    pub grades: MemberGrades,
    pub record: Vec<RecordItem>,
    pub lobby: LobbySummary,
    pub sentences: Vec<Sentence>,
}

pub fn member_detail(dataset: &Dataset, member: &Member, category: Option<&str>) -> MemberDetail {
    let pac = dataset.pac_for(&member.bioguide_id);
    MemberDetail {
        summary: member_summary(member),
        age: member.age,
        birth_year: member.birth_year,
        years_in_office: member.years_in_office,
        office_phone: member.office_phone.clone(),
        office_address: member.office_address.clone(),
        district_offices: member.district_offices.clone(),
        committees: member.committees.clone(),
        grades: category_grades(member, &dataset.categories),
        record: member_record(dataset, member, category),
        lobby: lobby_summary(member, pac),
        sentences: generate_sentences(
            member,
            &dataset.sentence_rules,
            cycle_total(pac, Cycle::last()),
            cycle_total(pac, Cycle::next()),
        ),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillSummary {
    pub column: String,
    pub label: String,
    pub bill_number: String,
    pub short_title: String,
    pub chamber: Option<Chamber>,
    pub position: Position,
    pub action_types: ActionTypes,
    pub kind: BillKind,
    pub points: f64,
    pub categories: Vec<String>,
    pub introduced: Option<String>,
    pub vote_result: Option<String>,
    pub sponsor: Option<String>,
    pub description: String,
    pub analysis: String,
    pub notes: String,
    pub congress_url: String,
    pub learn_more_link: String,
    pub no_cosponsor_benefit: bool,
}

pub fn bill_summary(meta: &BillMeta) -> BillSummary {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };
    BillSummary {
        column: meta.column.clone(),
        label: meta.label().to_string(),
        bill_number: meta.bill_number.clone(),
        short_title: meta.short_title.clone(),
        chamber: infer_chamber(Some(meta), &meta.column),
        position: meta.position,
        action_types: meta.action_types,
        kind: meta.kind,
        points: meta.points,
        categories: meta.categories.clone(),
        introduced: non_empty(&meta.introduced_date).map(|d| format_date(&d)),
        vote_result: non_empty(&meta.vote_tallies).or_else(|| non_empty(&meta.vote_result)),
        sponsor: non_empty(&meta.sponsor_name).or_else(|| non_empty(&meta.sponsor)),
        description: meta.description.clone(),
        analysis: meta.analysis.clone(),
        notes: meta.notes.clone(),
        congress_url: meta.congress_url.clone(),
        learn_more_link: meta.learn_more_link.clone(),
        no_cosponsor_benefit: meta.no_cosponsor_benefit,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillListResponse {
    pub count: usize,
    pub bills: Vec<BillSummary>,
}

/// Bills matching `filters` in column order.
pub fn bill_list(dataset: &Dataset, filters: &Filters) -> BillListResponse {
    let bills: Vec<BillSummary> = dataset
        .bills()
        .filter(|b| filters.matches_bill(b))
        .map(bill_summary)
        .collect();
    BillListResponse {
        count: bills.len(),
        bills,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BillDetail {
    pub bill: BillSummary,
    pub grouping: BillGrouping,
    pub map: GeoMap,
}

pub fn bill_detail(dataset: &Dataset, column: &str, filters: &Filters) -> Option<BillDetail> {
    let meta = dataset.meta(column)?;
    let grouping = group_bill(dataset, column, filters)?;
    Some(BillDetail {
        bill: bill_summary(meta),
        map: aggregate_geography(&grouping, &dataset.members),
        grouping,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryInfo {
    pub name: String,
    pub bill_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<CategoryInfo>,
}

pub fn category_list(dataset: &Dataset) -> CategoryListResponse {
    CategoryListResponse {
        categories: dataset
            .categories
            .iter()
            .map(|c| CategoryInfo {
                name: c.clone(),
                bill_count: dataset.bills().filter(|b| b.has_category(c)).count(),
            })
            .collect(),
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SupportCounts {
    pub supported: usize,
    pub rejects: usize,
    pub no_known_support: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LobbyViewResponse {
    pub counts: SupportCounts,
    pub members: Vec<LobbySummary>,
    pub map: GeoMap,
}

/// The AIPAC / DMFI support view for members matching `filters`.
pub fn lobby_view(dataset: &Dataset, filters: &Filters) -> LobbyViewResponse {
    let mut members: Vec<Member> = dataset
        .members
        .iter()
        .filter(|m| filters.matches_member(m))
        .cloned()
        .collect();
    members.sort_by_cached_key(|m| m.sort_key());

    let summaries: Vec<LobbySummary> = members
        .iter()
        .map(|m| lobby_summary(m, dataset.pac_for(&m.bioguide_id)))
        .collect();
    let mut counts = SupportCounts::default();
    for s in &summaries {
        match s.status {
            SupportStatus::Supported => counts.supported += 1,
            SupportStatus::Rejects => counts.rejects += 1,
            SupportStatus::NoKnownSupport => counts.no_known_support += 1,
        }
    }
    LobbyViewResponse {
        counts,
        map: aggregate_endorsements(&members, &dataset.pac),
        members: summaries,
    }
}
