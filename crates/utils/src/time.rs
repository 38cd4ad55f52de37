//! Date parsing that accepts RFC 3339 timestamps as well as plain `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const NAIVE_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

fn parse_with_date_time(value: &str, date_time: NaiveTime) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(value, NAIVE_DATETIME_FORMAT) {
        return Some(Utc.from_utc_datetime(&parsed));
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .map(|date| Utc.from_utc_datetime(&date.and_time(date_time)))
}

/// A plain date resolves to midnight UTC.
pub fn parse_flexible(value: &str) -> Option<DateTime<Utc>> {
    parse_with_date_time(value, NaiveTime::MIN)
}

/// A plain date resolves to the last millisecond of that day, for inclusive range ends.
pub fn parse_flexible_end(value: &str) -> Option<DateTime<Utc>> {
    let end_of_day = NaiveTime::from_hms_milli_opt(23, 59, 59, 999)?;
    parse_with_date_time(value, end_of_day)
}

/// `#[serde(with = "utils::time::flexible")]`
pub mod flexible {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_flexible(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected ISO 8601")))
    }
}

/// `#[serde(default, with = "utils::time::flexible_option")]`
pub mod flexible_option {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(value) => serializer.serialize_some(&value.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => super::parse_flexible(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid date `{raw}`, expected ISO 8601"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Timelike;

    use super::*;

    #[test]
    fn accepts_rfc3339_and_plain_dates() {
        let ts = parse_flexible("2024-03-01T10:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);

        let day = parse_flexible("2024-03-01").unwrap();
        assert_eq!(day.to_rfc3339(), "2024-03-01T00:00:00+00:00");

        let naive = parse_flexible("2024-03-01T09:15:00").unwrap();
        assert_eq!(naive.minute(), 15);

        assert!(parse_flexible("March 1st").is_none());
    }

    #[test]
    fn plain_end_date_covers_whole_day() {
        let end = parse_flexible_end("2024-03-01").unwrap();
        assert_eq!(end.hour(), 23);
        assert_eq!(end.minute(), 59);

        let explicit = parse_flexible_end("2024-03-01T12:00:00Z").unwrap();
        assert_eq!(explicit.hour(), 12);
    }

    #[derive(serde::Deserialize)]
    struct Window {
        #[serde(with = "flexible")]
        start: DateTime<Utc>,
        #[serde(default, with = "flexible_option")]
        end: Option<DateTime<Utc>>,
    }

    #[test]
    fn serde_helpers_parse_both_shapes() {
        let window: Window = serde_json::from_str(r#"{"start": "2024-01-02"}"#).unwrap();
        assert_eq!(window.start.to_rfc3339(), "2024-01-02T00:00:00+00:00");
        assert!(window.end.is_none());

        let window: Window =
            serde_json::from_str(r#"{"start": "2024-01-02T00:00:00Z", "end": "2024-02-01"}"#)
                .unwrap();
        assert!(window.end.is_some());

        assert!(serde_json::from_str::<Window>(r#"{"start": "yesterday"}"#).is_err());
    }
}
