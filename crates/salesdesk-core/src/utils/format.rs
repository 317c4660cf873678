use chrono::{DateTime, Local};

/// Shorten `s` to at most `max_len` characters, ending in "..." when cut.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    if max_len <= 3 {
        return s.chars().take(max_len).collect();
    }
    let kept: String = s.chars().take(max_len - 3).collect();
    format!("{}...", kept)
}

/// Sale timestamp as local `YYYY-MM-DD HH:MM`.
/// Bare dates and anything unparseable keep their first ten characters.
pub fn format_date(date: &str) -> String {
    match DateTime::parse_from_rfc3339(date) {
        Ok(dt) => dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => date.get(..10).unwrap_or(date).to_string(),
    }
}

/// Two-decimal amount
pub fn format_money(amount: f64) -> String {
    format!("{:.2}", amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("pan", 10), "pan");
        assert_eq!(truncate_string("pan integral", 8), "pan i...");
        assert_eq!(truncate_string("pan", 2), "pa");
        assert_eq!(truncate_string("añejo añejo", 6), "añe...");
    }

    #[test]
    fn test_format_date() {
        let shown = format_date("2025-03-09T08:00:00-05:00");
        assert_eq!(shown.len(), "2025-03-09 08:00".len());
        assert!(shown.starts_with("2025-03-"));
        assert_eq!(format_date("2025-03-09"), "2025-03-09");
        assert_eq!(format_date("soon"), "soon");
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(3.0), "3.00");
        assert_eq!(format_money(12.5), "12.50");
    }
}
