//! Date derivation for the `{Date}` placeholder.

use crate::error::{ConfigError, RecordError};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::fmt::Write;
use std::sync::LazyLock;

pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd";

/// Neutral → strftime tokens, applied in order.
const DATE_FORMAT_REPLACEMENTS: &[(&str, &str)] = &[
    ("yyyy", "%Y"),
    ("yyy", "%Y"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
];

static DATE_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})(\d{2})(\d{2})|(\d{4})[-_](\d{2})[-_](\d{2})").expect("Invalid regex")
});

const MODIFIED_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

const ISO_FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Source of "now". Injected so fallbacks are testable.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

pub fn translate_date_format(neutral: &str) -> String {
    DATE_FORMAT_REPLACEMENTS
        .iter()
        .fold(neutral.to_string(), |acc, (token, replacement)| {
            acc.replace(token, replacement)
        })
}

/// A neutral date format with its validated strftime translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    neutral: String,
    strftime: String,
}

impl DateFormat {
    pub fn parse(neutral: &str) -> Result<Self, ConfigError> {
        let strftime = translate_date_format(neutral);
        if StrftimeItems::new(&strftime).any(|item| matches!(item, Item::Error)) {
            return Err(ConfigError::InvalidDateFormat(neutral.to_string()));
        }
        Ok(Self {
            neutral: neutral.to_string(),
            strftime,
        })
    }

    pub fn neutral(&self) -> &str {
        &self.neutral
    }

    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    pub fn render(&self, value: &NaiveDateTime) -> Result<String, RecordError> {
        let mut out = String::new();
        write!(out, "{}", value.format(&self.strftime))
            .map_err(|_| RecordError::DateRender(self.neutral.clone()))?;
        Ok(out)
    }
}

impl Default for DateFormat {
    fn default() -> Self {
        Self {
            neutral: DEFAULT_DATE_FORMAT.to_string(),
            strftime: translate_date_format(DEFAULT_DATE_FORMAT),
        }
    }
}

/// First date token in a file name. Only the first match is considered.
pub fn date_from_file_name(file_name: &str) -> Option<NaiveDateTime> {
    let caps = DATE_TOKEN.captures(file_name)?;
    let (y, m, d) = if caps.get(1).is_some() {
        (&caps[1], &caps[2], &caps[3])
    } else {
        (&caps[4], &caps[5], &caps[6])
    };
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)?
        .and_hms_opt(0, 0, 0)
}

/// Parse a stored modification timestamp.
pub fn parse_modified(value: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z") {
        return Some(dt.naive_local());
    }
    for format in MODIFIED_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    ISO_FALLBACK_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// File-name token, then modification time, then the clock.
pub fn resolve_date(file_name: &str, modified: Option<&str>, clock: &dyn Clock) -> NaiveDateTime {
    date_from_file_name(file_name)
        .or_else(|| modified.filter(|m| !m.is_empty()).and_then(parse_modified))
        .unwrap_or_else(|| clock.now())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn translates_neutral_tokens() {
        assert_eq!(translate_date_format("yyyy-MM-dd"), "%Y-%m-%d");
        assert_eq!(translate_date_format("yyMMdd_HHmmss"), "%y%m%d_%H%M%S");
        assert_eq!(translate_date_format("dd.MM.yyyy hh"), "%d.%m.%Y %I");
    }

    #[test]
    fn rejects_untranslatable_formats() {
        assert!(DateFormat::parse("yyyy-MM-dd").is_ok());
        assert_eq!(
            DateFormat::parse("yyyy%").unwrap_err(),
            ConfigError::InvalidDateFormat("yyyy%".into())
        );
    }

    #[test]
    fn file_name_token_wins_over_modified() {
        let clock = FixedClock(at(2030, 1, 1));
        assert_eq!(
            resolve_date("stats_report_20240101.csv", Some("2024-01-05"), &clock),
            at(2024, 1, 1)
        );
        assert_eq!(
            resolve_date("export_2023_07_15.json", None, &clock),
            at(2023, 7, 15)
        );
    }

    #[test]
    fn invalid_token_falls_through_to_modified() {
        let clock = FixedClock(at(2030, 1, 1));
        assert_eq!(
            resolve_date("build_20241399.log", Some("2024-05-06"), &clock),
            at(2024, 5, 6)
        );
    }

    #[test]
    fn parses_modified_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(13, 4, 5)
            .unwrap();
        assert_eq!(parse_modified("2024-01-05T13:04:05"), Some(expected));
        assert_eq!(parse_modified("2024-01-05 13:04:05"), Some(expected));
        assert_eq!(parse_modified("2024-01-05T13:04:05+0200"), Some(expected));
        assert_eq!(parse_modified("2024-01-05T13:04:05Z"), Some(expected));
        assert_eq!(
            parse_modified("2024-01-05T13:04:05.250"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
                .unwrap()
                .and_hms_milli_opt(13, 4, 5, 250)
        );
        assert_eq!(parse_modified("January 5th"), None);
    }

    #[test]
    fn falls_back_to_clock() {
        let clock = FixedClock(at(2025, 2, 3));
        assert_eq!(resolve_date("notes.txt", None, &clock), at(2025, 2, 3));
        assert_eq!(resolve_date("notes.txt", Some(""), &clock), at(2025, 2, 3));
        assert_eq!(resolve_date("notes.txt", Some("garbage"), &clock), at(2025, 2, 3));
    }

    #[test]
    fn renders_with_configured_format() {
        let format = DateFormat::parse("dd.MM.yyyy").unwrap();
        assert_eq!(format.render(&at(2024, 1, 1)).unwrap(), "01.01.2024");
        assert_eq!(DateFormat::default().strftime(), "%Y-%m-%d");
    }
}
