use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{CrawlError, CrawlResult};

pub const DATE_FORMAT: &str = "%d.%m.%Y";

static MATCH_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{2}\.\d{2}\.\d{4})\b").expect("date pattern compiles"));

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Finds the `DD.MM.YYYY` part of the date line in the match header.
pub fn extract_match_date(text: &str) -> CrawlResult<NaiveDate> {
    MATCH_DATE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|date| NaiveDate::parse_from_str(date.as_str(), DATE_FORMAT).ok())
        .ok_or_else(|| CrawlError::InvalidDate(text.to_string()))
}

pub fn parse_goals(text: &str) -> CrawlResult<u32> {
    text.trim()
        .parse()
        .map_err(|_| CrawlError::InvalidScore(text.to_string()))
}

/// The half-time box is one string like `"(2-1)"`. Its first digit is the
/// home side, its second the away side, anything past that is ignored.
pub fn split_half_time(text: &str) -> (char, char) {
    let mut digits = text.chars().filter(char::is_ascii_digit);
    let home = digits.next().unwrap_or('0');
    let away = digits.next().unwrap_or('0');
    (home, away)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn half_time_digits() {
        assert_eq!(split_half_time("2-1"), ('2', '1'));
        assert_eq!(split_half_time(""), ('0', '0'));
        assert_eq!(split_half_time("1"), ('1', '0'));
        assert_eq!(split_half_time("İY (0 - 3)"), ('0', '3'));
    }

    #[test]
    fn double_digit_half_time_keeps_the_first_two_digits() {
        assert_eq!(split_half_time("10-2"), ('1', '0'));
    }

    #[test]
    fn date_is_found_inside_header_text() {
        let expected = NaiveDate::from_ymd_opt(2023, 8, 12).unwrap();
        assert_eq!(extract_match_date("12.08.2023").unwrap(), expected);
        assert_eq!(extract_match_date(" 12.08.2023 17:00 ").unwrap(), expected);
        assert!(matches!(
            extract_match_date("Cumartesi"),
            Err(CrawlError::InvalidDate(_))
        ));
        assert!(extract_match_date("31.02.2023").is_err());
    }

    #[test]
    fn goals_must_be_numbers() {
        assert_eq!(parse_goals(" 3 ").unwrap(), 3);
        assert!(matches!(parse_goals("-"), Err(CrawlError::InvalidScore(_))));
    }

    #[test]
    fn dates_format_with_leading_zeros() {
        assert_eq!(
            format_date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()),
            "05.01.2024"
        );
    }
}
