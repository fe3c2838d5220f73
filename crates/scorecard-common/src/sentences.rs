/// Highlight sentences for the social-share card, driven by `graphic_sentences.csv`.
use serde::{Deserialize, Serialize};

use crate::model::{Chamber, Member, SentenceRule};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sentence {
    pub text: String,
    pub is_good: bool,
}

impl Sentence {
    fn good(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_good: true,
        }
    }

    fn bad(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_good: false,
        }
    }
}

/// Rule sentences that only make the card when fewer than this many others exist.
const CROWDED_CARD: usize = 3;

/// `12345.6` → `"12,345.6"`: thousands separators, cents kept, trailing zeros dropped.
pub fn format_dollars(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 4);
    if amount < 0.0 && cents > 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    match cents % 100 {
        0 => {}
        c if c % 10 == 0 => out.push_str(&format!(".{}", c / 10)),
        c => out.push_str(&format!(".{c:02}")),
    }
    out
}

fn positive(member: &Member, column: &str) -> bool {
    member.value_of(column).is_some_and(|v| v > 0.0)
}

/// Whether the member had the chance to act on any of the rule's columns.
fn had_opportunity(member: &Member, columns: &[String]) -> bool {
    columns.iter().any(|col| {
        member.value_of(col).is_some()
            && (col.ends_with("_cosponsor")
                || member.value_of(&format!("{col}_absent")) != Some(1.0))
    })
}

fn apply_rule(member: &Member, rule: &SentenceRule) -> Option<Sentence> {
    let any_positive = rule.columns.iter().any(|c| positive(member, c));
    let text = |lead: &str| format!("{lead} {}", rule.ending);

    if rule.check_positive_points {
        if any_positive {
            return rule.good_text.as_deref().map(|t| Sentence::good(text(t)));
        }
        if had_opportunity(member, &rule.columns) {
            return rule.bad_text.as_deref().map(|t| Sentence::bad(text(t)));
        }
        None
    } else if any_positive {
        rule.bad_text.as_deref().map(|t| Sentence::bad(text(t)))
    } else {
        None
    }
}

/// The Block the Bombs rule is held back and only shown on an otherwise sparse card.
fn is_deferred(rule: &SentenceRule) -> bool {
    let mentions = |s: &str| s.to_lowercase().contains("block the bombs");
    rule.check_positive_points && (rule.columns.iter().any(|c| mentions(c)) || mentions(&rule.ending))
}

fn lobby_sentence(member: &Member, last_cycle_total: f64, next_cycle_total: f64) -> Option<Sentence> {
    let rejects = member
        .reject_aipac_commitment
        .as_deref()
        .is_some_and(|s| !s.trim().is_empty());
    let received_last = || {
        Sentence::bad(format!(
            "Received ${} in support from the Israel Lobby last election.",
            format_dollars(last_cycle_total)
        ))
    };

    match member.chamber {
        Chamber::Senate if rejects => Some(Sentence::good("Publicly rejects AIPAC and DMFI.")),
        Chamber::Senate if next_cycle_total > 0.0 => Some(Sentence::bad(format!(
            "Has already accepted ${} in support from the Israel Lobby for their next election.",
            format_dollars(next_cycle_total)
        ))),
        Chamber::Senate if last_cycle_total > 0.0 => Some(received_last()),
        Chamber::Senate => Some(Sentence::good("Does not take money from AIPAC and DMFI.")),
        Chamber::House if rejects => Some(Sentence::good(
            "Publicly rejects support from AIPAC and DMFI.",
        )),
        Chamber::House if last_cycle_total > 0.0 => Some(received_last()),
        Chamber::House => None,
    }
}

/// Sentences for `member` from the rules of their chamber plus the lobby-money line,
/// favorable sentences first.
pub fn generate_sentences(
    member: &Member,
    rules: &[SentenceRule],
    last_cycle_total: f64,
    next_cycle_total: f64,
) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut deferred = None;
    for rule in rules.iter().filter(|r| r.chamber == member.chamber) {
        let Some(sentence) = apply_rule(member, rule) else {
            continue;
        };
        if is_deferred(rule) {
            deferred = Some(sentence);
        } else {
            sentences.push(sentence);
        }
    }
    sentences.extend(lobby_sentence(member, last_cycle_total, next_cycle_total));
    if sentences.len() < CROWDED_CARD {
        sentences.extend(deferred);
    }
    sentences.sort_by_key(|s| !s.is_good);
    sentences
}
