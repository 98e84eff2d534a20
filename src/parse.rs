//! Parsers for the textual value formats carried by configuration keys.
//!
//! Every configuration value is stored as a string; these helpers turn those
//! strings into durations, dates, record lists and absolute-or-percent counts.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;

/// Failure to interpret a configuration string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseValueError(String);

impl ParseValueError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// One element of a record list such as `ec2.key,Stable,weight=2`.
///
/// The first field is the record name; `k=v` fields are parameters and bare
/// fields are flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,

    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub flags: BTreeSet<String>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
}

impl Record {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Parse a single `name[,Flag][,k=v]...` record.
    pub fn parse(text: &str) -> Self {
        let mut record = Record::default();
        for (index, field) in text.split(',').map(str::trim).enumerate() {
            if field.is_empty() {
                continue;
            }
            match field.split_once('=') {
                Some((k, v)) => {
                    record.params.insert(k.trim().to_string(), v.trim().to_string());
                }
                None if index == 0 => record.name = field.to_string(),
                None => {
                    record.flags.insert(field.to_string());
                }
            }
        }
        record
    }
}

/// Parse a `;`-separated list of records. Empty elements are skipped.
pub fn parse_records(text: &str) -> Vec<Record> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Record::parse)
        .collect()
}

/// Parse a duration: a bare number is seconds, anything else uses
/// humantime syntax (`1h 30m`, `45s`, `2days`).
pub fn parse_duration(text: &str) -> Result<Duration, ParseValueError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseValueError::new("empty duration"));
    }
    if let Ok(secs) = text.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    if let Ok(secs) = text.parse::<f64>() {
        return Duration::try_from_secs_f64(secs).map_err(|e| ParseValueError::new(e.to_string()));
    }
    humantime::parse_duration(text).map_err(|e| ParseValueError::new(e.to_string()))
}

/// Parse a UTC timestamp: RFC 3339, or `YYYY-MM-DD[ HH:MM:SS]` taken as UTC.
pub fn parse_date(text: &str) -> Result<DateTime<Utc>, ParseValueError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, pattern) {
            return Ok(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ParseValueError::new(format!("unrecognized date '{}'", text)))
}

/// Interpret `"25%"` as a share of `max_value` (rounded up) and anything
/// else as an absolute integer.
pub fn abs_or_percent(text: &str, max_value: i64) -> Result<i64, ParseValueError> {
    let text = text.trim();
    match text.strip_suffix('%') {
        Some(pct) => {
            let pct: f64 = pct
                .trim()
                .parse()
                .map_err(|_| ParseValueError::new(format!("invalid percentage '{}'", text)))?;
            Ok((pct / 100.0 * max_value as f64).ceil() as i64)
        }
        None => text
            .parse()
            .map_err(|_| ParseValueError::new(format!("invalid absolute value '{}'", text))),
    }
}

/// Parse a boolean flag value.
pub fn parse_bool(text: &str) -> Result<bool, ParseValueError> {
    match text.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ParseValueError::new(format!("invalid boolean '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_record_name_flags_params() {
        let record = Record::parse("config.loaded_files,Stable,weight=2");
        assert_eq!(record.name, "config.loaded_files");
        assert!(record.has_flag("Stable"));
        assert_eq!(record.params.get("weight"), Some(&"2".to_string()));
    }

    #[test]
    fn test_record_list() {
        let records = parse_records("ec2.key1; ec2.key2,Stable;;");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "ec2.key1");
        assert_eq!(records[1].name, "ec2.key2");
        assert!(records[1].has_flag("Stable"));
        assert!(parse_records("").is_empty());
    }

    #[test]
    fn test_duration_formats() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("1.5").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration("2days").unwrap(), Duration::from_secs(172_800));
        assert!(parse_duration("soon").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_date_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap();
        assert_eq!(parse_date("2024-03-01T10:30:00Z").unwrap(), expected);
        assert_eq!(parse_date("2024-03-01T12:30:00+02:00").unwrap(), expected);
        assert_eq!(parse_date("2024-03-01 10:30:00").unwrap(), expected);
        assert_eq!(
            parse_date("2024-03-01").unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_abs_or_percent() {
        assert_eq!(abs_or_percent("25%", 10).unwrap(), 3);
        assert_eq!(abs_or_percent("100%", 7).unwrap(), 7);
        assert_eq!(abs_or_percent("4", 10).unwrap(), 4);
        assert!(abs_or_percent("many", 10).is_err());
        assert!(abs_or_percent("x%", 10).is_err());
    }

    #[test]
    fn test_bool() {
        assert!(parse_bool("1").unwrap());
        assert!(parse_bool("True").unwrap());
        assert!(!parse_bool("0").unwrap());
        assert!(!parse_bool("").unwrap());
        assert!(parse_bool("maybe").is_err());
    }
}
