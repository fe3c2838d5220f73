/// Endorsement and funding resolution against the PAC dataset.
///
/// The PAC dataset is authoritative; the per-row `aipac_supported` / `dmfi_supported` flags on
/// the member CSV are a fallback for members it does not cover.
use serde::Serialize;

use crate::model::{Chamber, Cycle, CycleFunding, LobbyFunding, Member, PacRecord};
use crate::normalize::is_truthy;

/// Cycle preference when choosing which funding to show.
const DISPLAY_PRIORITY: [Cycle; 3] = [Cycle::Y2024, Cycle::Y2026, Cycle::Y2022];

fn supported_any_cycle(pac: Option<&PacRecord>, lobby: impl Fn(&CycleFunding) -> &LobbyFunding) -> bool {
    pac.is_some_and(|p| p.cycles.values().any(|c| lobby(c).supported))
}

pub fn is_aipac_endorsed(pac: Option<&PacRecord>, row_flag: Option<&str>) -> bool {
    supported_any_cycle(pac, |c| &c.aipac) || row_flag.is_some_and(is_truthy)
}

pub fn is_dmfi_endorsed(pac: Option<&PacRecord>, row_flag: Option<&str>) -> bool {
    supported_any_cycle(pac, |c| &c.dmfi) || row_flag.is_some_and(is_truthy)
}

/// A public rejection commitment is on file, whether or not support was ever offered.
pub fn rejects_support(member: &Member) -> bool {
    [&member.reject_commitment, &member.reject_aipac_commitment]
        .into_iter()
        .any(|s| s.as_deref().is_some_and(|s| !s.trim().is_empty()))
}

/// Combined AIPAC + DMFI dollars for one cycle; zero without a record.
pub fn cycle_total(pac: Option<&PacRecord>, cycle: Cycle) -> f64 {
    pac.map(|p| p.cycle(cycle).total()).unwrap_or(0.0)
}

/// Cycle whose funding should be shown: the first in priority order with dollars, then the
/// first with a support flag.
pub fn display_cycle(pac: &PacRecord) -> Option<Cycle> {
    let funding = |c: Cycle| pac.cycle(c);
    DISPLAY_PRIORITY
        .iter()
        .find(|c| {
            let f = funding(**c);
            f.aipac.has_dollars() || f.dmfi.has_dollars()
        })
        .or_else(|| {
            DISPLAY_PRIORITY.iter().find(|c| {
                let f = funding(**c);
                f.aipac.supported || f.dmfi.supported
            })
        })
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportStatus {
    Rejects,
    Supported,
    NoKnownSupport,
}

pub fn support_status(member: &Member, pac: Option<&PacRecord>) -> SupportStatus {
    if rejects_support(member) {
        SupportStatus::Rejects
    } else if is_aipac_endorsed(pac, member.aipac_supported.as_deref())
        || is_dmfi_endorsed(pac, member.dmfi_supported.as_deref())
    {
        SupportStatus::Supported
    } else {
        SupportStatus::NoKnownSupport
    }
}

/// One member's row in the lobby-support view.
#[derive(Debug, Clone, Serialize)]
pub struct LobbySummary {
    pub bioguide_id: String,
    pub full_name: String,
    pub party: String,
    pub chamber: Chamber,
    pub state: String,
    pub district: String,
    pub status: SupportStatus,
    pub aipac_endorsed: bool,
    pub dmfi_endorsed: bool,
    pub rejects: bool,
    pub reject_link: Option<String>,
    pub aipac_featured: bool,
    pub dmfi_website: bool,
    pub display_cycle: Option<Cycle>,
    pub funding: Option<CycleFunding>,
    pub last_cycle_total: f64,
    pub next_cycle_total: f64,
}

pub fn lobby_summary(member: &Member, pac: Option<&PacRecord>) -> LobbySummary {
    let cycle = pac.and_then(display_cycle);
    LobbySummary {
        bioguide_id: member.bioguide_id.clone(),
        full_name: member.full_name.clone(),
        party: member.party.clone(),
        chamber: member.chamber,
        state: member.state.clone(),
        district: member.district.clone(),
        status: support_status(member, pac),
        aipac_endorsed: is_aipac_endorsed(pac, member.aipac_supported.as_deref()),
        dmfi_endorsed: is_dmfi_endorsed(pac, member.dmfi_supported.as_deref()),
        rejects: rejects_support(member),
        reject_link: member.reject_aipac_link.clone(),
        aipac_featured: pac.is_some_and(|p| p.aipac_featured),
        dmfi_website: pac.is_some_and(|p| p.dmfi_website),
        funding: pac.zip(cycle).map(|(p, c)| p.cycle(c)),
        display_cycle: cycle,
        last_cycle_total: cycle_total(pac, Cycle::last()),
        next_cycle_total: cycle_total(pac, Cycle::next()),
    }
}
