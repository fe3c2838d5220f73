/// Social-share card for a member, rendered as a standalone SVG.
use scorecard_common::api::member_summary;
use scorecard_common::grades::{grade_color, grade_text_color};
use scorecard_common::model::{Chamber, Cycle, Dataset, Member};
use scorecard_common::pac::cycle_total;
use scorecard_common::sentences::{format_dollars, generate_sentences, Sentence};
use serde::Deserialize;
use tracing::debug;

const SIZE: u32 = 672;
const PADDING: u32 = 24;
const PHOTO_WIDTH: u32 = 220;

/// Query parameters; anything omitted is filled from the dataset.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareParams {
    pub name: Option<String>,
    pub grade: Option<String>,
    pub total: Option<String>,
    pub max: Option<String>,
    pub chamber: Option<String>,
    pub party: Option<String>,
    pub location: Option<String>,
    pub photo: Option<String>,
    pub photo_fallback: Option<String>,
    /// JSON array of `{ "text": ..., "isGood": ... }`.
    pub sentences: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShareCard {
    pub name: String,
    pub grade: String,
    pub total: String,
    pub max: String,
    /// "Representative" or "Senator".
    pub chamber: String,
    pub party: String,
    pub location: String,
    pub photo: Option<String>,
    pub sentences: Vec<Sentence>,
}

fn given(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn number(value: Option<f64>) -> Option<String> {
    value.map(format_dollars)
}

impl ShareCard {
    pub fn resolve(params: ShareParams, member: Option<&Member>, dataset: Option<&Dataset>) -> Self {
        let summary = member.map(member_summary);
        let sentences = match given(params.sentences) {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(error = %e, "ignoring malformed sentences parameter");
                Vec::new()
            }),
            None => match (member, dataset) {
                (Some(m), Some(ds)) => {
                    let pac = ds.pac_for(&m.bioguide_id);
                    generate_sentences(
                        m,
                        &ds.sentence_rules,
                        cycle_total(pac, Cycle::last()),
                        cycle_total(pac, Cycle::next()),
                    )
                }
                _ => Vec::new(),
            },
        };

        // Congress.gov photos are preferred when both are given.
        let photo = given(params.photo_fallback)
            .or_else(|| given(params.photo))
            .or_else(|| summary.as_ref().and_then(|s| s.photo_url.clone()));

        Self {
            name: given(params.name)
                .or_else(|| summary.as_ref().map(|s| s.full_name.clone()))
                .unwrap_or_else(|| "Unknown Member".to_string()),
            grade: given(params.grade)
                .or_else(|| summary.as_ref().map(|s| s.grade.clone()))
                .unwrap_or_else(|| "N/A".to_string()),
            total: given(params.total)
                .or_else(|| number(summary.as_ref().and_then(|s| s.total)))
                .unwrap_or_else(|| "0".to_string()),
            max: given(params.max)
                .or_else(|| number(summary.as_ref().and_then(|s| s.max_possible)))
                .unwrap_or_else(|| "0".to_string()),
            chamber: given(params.chamber)
                .or_else(|| summary.as_ref().map(|s| s.title.to_string()))
                .unwrap_or_else(|| "Representative".to_string()),
            party: given(params.party)
                .or_else(|| summary.as_ref().map(|s| s.party.clone()))
                .unwrap_or_else(|| "I".to_string()),
            location: given(params.location)
                .or_else(|| summary.as_ref().map(|s| s.location.clone()))
                .unwrap_or_default(),
            photo,
            sentences,
        }
    }

    fn chamber_label(&self) -> &'static str {
        if self.chamber.eq_ignore_ascii_case("senator") || Chamber::parse(&self.chamber) == Some(Chamber::Senate) {
            "Senate"
        } else {
            "House"
        }
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

/// "New York-15" → "New York 15th District"; anything else is shown as is.
pub fn describe_location(location: &str) -> String {
    match location.rsplit_once('-') {
        Some((state, district)) if !state.contains('-') => match district.trim().parse::<u32>() {
            Ok(0) => format!("{} At-Large", state.trim()),
            Ok(n) => format!("{} {} District", state.trim(), ordinal(n)),
            Err(_) => location.to_string(),
        },
        _ => location.to_string(),
    }
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Greedy word wrap to at most `width` characters per line.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut line));
        }
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

fn sentence_font_size(count: usize) -> u32 {
    match count {
        n if n > 5 => 23,
        n if n > 3 => 26,
        _ => 29,
    }
}

pub fn render_svg(card: &ShareCard) -> String {
    let fill = grade_color(&card.grade);
    let on_fill = grade_text_color(&card.grade);
    let mut svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{SIZE}" height="{SIZE}" viewBox="0 0 {SIZE} {SIZE}">
<defs><linearGradient id="bg" x1="0" y1="0" x2="1" y2="1"><stop offset="0%" stop-color="#0B1220"/><stop offset="50%" stop-color="#1a2744"/><stop offset="100%" stop-color="#0B1220"/></linearGradient></defs>
<rect width="{SIZE}" height="{SIZE}" fill="url(#bg)"/>
<text x="{cx}" y="70" text-anchor="middle" font-family="Inter, sans-serif" font-size="44" font-weight="bold" fill="#ffffff">{name}</text>
<text x="{cx}" y="100" text-anchor="middle" font-family="Inter, sans-serif" font-size="14" letter-spacing="1" fill="#94a3b8">{chamber} • {party} • {location}</text>
<rect x="{grade_x}" y="120" width="120" height="120" rx="16" fill="{fill}"/>
<text x="{grade_cx}" y="205" text-anchor="middle" font-family="Inter, sans-serif" font-size="72" font-weight="bold" fill="{on_fill}">{grade}</text>
<text x="{grade_cx}" y="262" text-anchor="middle" font-family="Inter, sans-serif" font-size="16" fill="#cbd5e1">{total} / {max} pts</text>
"##,
        cx = SIZE / 2,
        name = escape_xml(&card.name),
        chamber = card.chamber_label().to_uppercase(),
        party = escape_xml(&card.party.to_uppercase()),
        location = escape_xml(&describe_location(&card.location).to_uppercase()),
        grade_x = SIZE - PADDING - 120,
        grade_cx = SIZE - PADDING - 60,
        grade = escape_xml(&card.grade),
        total = escape_xml(&card.total),
        max = escape_xml(&card.max),
    );

    let text_x = if let Some(photo) = &card.photo {
        svg.push_str(&format!(
            r#"<image x="{PADDING}" y="130" width="{PHOTO_WIDTH}" height="{h}" preserveAspectRatio="xMidYMin slice" href="{href}" xlink:href="{href}"/>"#,
            h = SIZE - 130 - PADDING,
            href = escape_xml(photo),
        ));
        svg.push('\n');
        PADDING * 2 + PHOTO_WIDTH
    } else {
        PADDING * 2
    };

    let font = sentence_font_size(card.sentences.len());
    let line_height = font + font / 3;
    let width_chars = ((SIZE - text_x - PADDING) as f64 / (font as f64 * 0.55)) as usize;
    let mut y = 290;
    for sentence in &card.sentences {
        let color = if sentence.is_good { "#5BA66B" } else { "#ef4444" };
        let mark = if sentence.is_good { "✓" } else { "✗" };
        for (i, line) in wrap(&sentence.text, width_chars.max(12)).iter().enumerate() {
            if y > SIZE - PADDING {
                break;
            }
            let prefix = if i == 0 { format!("{mark} ") } else { "  ".to_string() };
            svg.push_str(&format!(
                r#"<text x="{text_x}" y="{y}" font-family="Inter, sans-serif" font-size="{font}" fill="{color}">{}</text>"#,
                escape_xml(&format!("{prefix}{line}")),
            ));
            svg.push('\n');
            y += line_height;
        }
        y += font / 2;
    }
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use scorecard_common::loader::{parse_manual_labels, parse_meta, parse_members, parse_sentence_rules};

    fn member() -> (Dataset, Member) {
        let meta = parse_meta("column,display_name,chamber,action_types,points\nHR1,Iran WPR,HOUSE,vote,4\n").unwrap();
        let parsed = parse_members(
            "bioguide_id,full_name,party,chamber,state,district,photo_url,HR1,Total,Max_Possible,Grade\n\
             A000001,Ann Alpha,Democratic,HOUSE,California,12,https://img.example/a.jpg,4,4,4,A\n",
            &meta,
        )
        .unwrap();
        let rules = parse_sentence_rules(
            "chamber,columns,check_positive_points,good_text,bad_text,ending\n\
             HOUSE,HR1,true,Supports,Does not support,peace with Iran.\n",
        )
        .unwrap();
        let member = parsed.members[0].clone();
        let dataset = Dataset {
            members: parsed.members,
            columns: parsed.columns,
            sentence_rules: rules,
            manual_labels: parse_manual_labels("label,score,custom_scoring_description\n").unwrap(),
            ..Default::default()
        };
        (dataset, member)
    }

    #[test]
    fn locations() {
        assert_eq!(describe_location("New York-15"), "New York 15th District");
        assert_eq!(describe_location("OH-03"), "OH 3rd District");
        assert_eq!(describe_location("TX-11"), "TX 11th District");
        assert_eq!(describe_location("WY-00"), "WY At-Large");
        assert_eq!(describe_location("Ohio"), "Ohio");
    }

    #[test]
    fn wrapping_and_escaping() {
        assert_eq!(wrap("one two three four", 9), vec!["one two", "three", "four"]);
        assert_eq!(escape_xml(r#"A&B <"x">"#), "A&amp;B &lt;&quot;x&quot;&gt;");
    }

    #[test]
    fn params_win_over_dataset() {
        let (ds, ann) = member();
        let card = ShareCard::resolve(
            ShareParams {
                name: Some("Rep. Alpha".to_string()),
                grade: Some(" B+ ".to_string()),
                location: Some("".to_string()),
                ..Default::default()
            },
            Some(&ann),
            Some(&ds),
        );
        assert_eq!(card.name, "Rep. Alpha");
        assert_eq!(card.grade, "B+");
        assert_eq!(card.total, "4");
        assert_eq!(card.location, "CA-12");
        assert_eq!(card.party, "Democrat");
        assert_eq!(card.photo.as_deref(), Some("https://img.example/a.jpg"));
        assert_eq!(
            card.sentences,
            vec![Sentence {
                text: "Supports peace with Iran.".to_string(),
                is_good: true
            }]
        );
    }

    #[test]
    fn defaults_without_member() {
        let card = ShareCard::resolve(
            ShareParams {
                sentences: Some(r#"[{"text":"Voted no.","isGood":false}]"#.to_string()),
                ..Default::default()
            },
            None,
            None,
        );
        assert_eq!(card.name, "Unknown Member");
        assert_eq!(card.grade, "N/A");
        assert_eq!(card.chamber, "Representative");
        assert_eq!(card.sentences.len(), 1);
        assert!(!card.sentences[0].is_good);

        let card = ShareCard::resolve(
            ShareParams {
                sentences: Some("not json".to_string()),
                ..Default::default()
            },
            None,
            None,
        );
        assert!(card.sentences.is_empty());
    }

    #[test]
    fn svg_contains_escaped_fields() {
        let card = ShareCard {
            name: "Ann <Alpha>".to_string(),
            grade: "A".to_string(),
            total: "4".to_string(),
            max: "4".to_string(),
            chamber: "Senator".to_string(),
            party: "Democrat".to_string(),
            location: "CA".to_string(),
            photo: None,
            sentences: vec![Sentence {
                text: "Supports peace & diplomacy.".to_string(),
                is_good: true,
            }],
        };
        let svg = render_svg(&card);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("Ann &lt;Alpha&gt;"));
        assert!(svg.contains("SENATE • DEMOCRAT • CA"));
        assert!(svg.contains("peace &amp; diplomacy."));
        assert!(svg.contains(grade_color("A")));
        assert!(!svg.contains("<image"));
    }

    #[test]
    fn svg_places_photo_and_one_element_per_line() {
        let (ds, ann) = member();
        let card = ShareCard::resolve(ShareParams::default(), Some(&ann), Some(&ds));
        let svg = render_svg(&card);

        let lines: Vec<&str> = svg.lines().collect();
        assert!(lines
            .iter()
            .any(|l| l.starts_with("<image ") && l.contains(r#"href="https://img.example/a.jpg""#)));
        let sentence_lines: Vec<&&str> = lines.iter().filter(|l| l.contains("✓")).collect();
        assert_eq!(sentence_lines.len(), 1);
        assert!(sentence_lines[0].starts_with("<text x=\"268\""));
        assert!(sentence_lines[0].ends_with("</text>"));
        assert_eq!(lines.last(), Some(&"</svg>"));
    }
}
