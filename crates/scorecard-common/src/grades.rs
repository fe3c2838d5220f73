/// Letter-grade palette shared by the JSON views and the share image.

pub const GRADE_A: &str = "#0A6F7A";
pub const GRADE_B: &str = "#2DA0A2";
pub const GRADE_C: &str = "#9CCB99";
pub const GRADE_D: &str = "#ccb254";
pub const GRADE_F: &str = "#A96A63";
pub const GRADE_UNKNOWN: &str = "#94A3B8";

const LIGHT_TEXT: &str = "#ffffff";
const DARK_TEXT: &str = "#4b5563";

fn letter(grade: &str) -> Option<char> {
    grade.trim().chars().next().map(|c| c.to_ascii_uppercase())
}

/// Fill color for a grade such as "A-" or "C+"; modifiers are ignored.
pub fn grade_color(grade: &str) -> &'static str {
    match letter(grade) {
        Some('A') => GRADE_A,
        Some('B') => GRADE_B,
        Some('C') => GRADE_C,
        Some('D') => GRADE_D,
        Some('F') => GRADE_F,
        _ => GRADE_UNKNOWN,
    }
}

/// Text color readable on top of [`grade_color`].
pub fn grade_text_color(grade: &str) -> &'static str {
    match letter(grade) {
        Some('A' | 'B') => LIGHT_TEXT,
        _ => DARK_TEXT,
    }
}

const GRADE_ORDER: [&str; 13] = [
    "A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "D-", "F",
];

/// Position in best-to-worst order; unknown grades rank after "F".
pub fn grade_rank(grade: &str) -> usize {
    let grade = grade.trim().to_ascii_uppercase();
    GRADE_ORDER
        .iter()
        .position(|g| *g == grade)
        .unwrap_or(GRADE_ORDER.len())
}
