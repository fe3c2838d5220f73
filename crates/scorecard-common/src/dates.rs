use chrono::NaiveDate;

/// Render a metadata date as e.g. "January 9, 2025".
///
/// Accepts `2025-01-09`, `9-Jan-2025` and `1/9/25` / `1/9/2025`. Two-digit years below 50
/// are read as 20xx. Anything else is returned unchanged.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    match parse_date(raw) {
        Some(date) => date.format("%B %-d, %Y").to_string(),
        None => raw.to_string(),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%d-%b-%Y") {
        return Some(date);
    }

    let mut parts = raw.split('/');
    let (Some(month), Some(day), Some(year), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return None;
    };
    let month: u32 = month.trim().parse().ok()?;
    let day: u32 = day.trim().parse().ok()?;
    let mut year: i32 = year.trim().parse().ok()?;
    if year < 100 {
        year += if year < 50 { 2000 } else { 1900 };
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_formats() {
        assert_eq!(format_date("2025-01-09"), "January 9, 2025");
        assert_eq!(format_date("9-Jan-2025"), "January 9, 2025");
        assert_eq!(format_date("3/14/25"), "March 14, 2025");
        assert_eq!(format_date("3/14/1999"), "March 14, 1999");
        assert_eq!(format_date("12/1/75"), "December 1, 1975");
    }

    #[test]
    fn unparseable_passes_through() {
        assert_eq!(format_date("sometime in spring"), "sometime in spring");
        assert_eq!(format_date("13/40/25"), "13/40/25");
        assert_eq!(format_date(""), "");
    }
}
