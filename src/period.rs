use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use tracing::warn;
use uuid::Uuid;

use crate::models::{
    Diagnostics, ListingRecord, RawTimestamp, RecordKind, SkipReason, UserRecord,
};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A record whose creation time drives the dashboard windows.
pub trait Timestamped {
    fn kind(&self) -> RecordKind;
    fn record_id(&self) -> Uuid;
    /// First present timestamp field, in fallback order.
    fn raw_timestamp(&self) -> Option<&RawTimestamp>;

    fn resolve_timestamp(&self) -> Result<DateTime<Utc>, SkipReason> {
        let raw = self.raw_timestamp().ok_or(SkipReason::MissingDate)?;
        parse_timestamp(raw).ok_or_else(|| match raw {
            RawTimestamp::Text(text) => SkipReason::UnparseableDate(text.clone()),
            RawTimestamp::Instant(instant) => SkipReason::UnparseableDate(instant.to_rfc3339()),
            RawTimestamp::Other(value) => SkipReason::UnparseableDate(value.to_string()),
        })
    }

    /// Resolves the timestamp, logging and recording the record when it can't.
    fn resolve_or_skip(&self, diagnostics: &mut Diagnostics) -> Option<DateTime<Utc>> {
        match self.resolve_timestamp() {
            Ok(instant) => Some(instant),
            Err(reason) => {
                warn!(kind = ?self.kind(), id = %self.record_id(), ?reason, "skipping record without usable date");
                diagnostics.skip(self.kind(), self.record_id(), reason);
                None
            }
        }
    }
}

impl<T: Timestamped + ?Sized> Timestamped for &T {
    fn kind(&self) -> RecordKind {
        (**self).kind()
    }

    fn record_id(&self) -> Uuid {
        (**self).record_id()
    }

    fn raw_timestamp(&self) -> Option<&RawTimestamp> {
        (**self).raw_timestamp()
    }
}

impl Timestamped for UserRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::User
    }

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn raw_timestamp(&self) -> Option<&RawTimestamp> {
        present(&self.created_at).or(present(&self.join_date))
    }
}

impl Timestamped for ListingRecord {
    fn kind(&self) -> RecordKind {
        RecordKind::Listing
    }

    fn record_id(&self) -> Uuid {
        self.id
    }

    fn raw_timestamp(&self) -> Option<&RawTimestamp> {
        present(&self.created_at).or(present(&self.date))
    }
}

/// Blank text counts as absent so the fallback field gets its turn.
fn present(field: &Option<RawTimestamp>) -> Option<&RawTimestamp> {
    match field {
        Some(RawTimestamp::Text(text)) if text.trim().is_empty() => None,
        other => other.as_ref(),
    }
}

/// Accepts RFC 3339, naive date-times (as UTC) and bare dates (midnight UTC).
/// Non-string JSON values never parse.
pub fn parse_timestamp(raw: &RawTimestamp) -> Option<DateTime<Utc>> {
    let text = match raw {
        RawTimestamp::Instant(instant) => return Some(*instant),
        RawTimestamp::Text(text) => text.trim(),
        RawTimestamp::Other(_) => return None,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(text, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight))
}

/// Items whose timestamp lies in `[start, end]`. Missing or unparseable
/// timestamps never match.
pub fn filter_by_date_range<T: Timestamped>(
    items: &[T],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Vec<&T> {
    items
        .iter()
        .filter(|item| match item.resolve_timestamp() {
            Ok(instant) => start <= instant && instant <= end,
            Err(_) => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserStatus;
    use chrono::Duration;

    fn user(created_at: Option<&str>, join_date: Option<&str>) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            full_name: "Avery Lee".to_string(),
            created_at: created_at.map(RawTimestamp::from),
            join_date: join_date.map(RawTimestamp::from),
            user_status: UserStatus::Active,
        }
    }

    fn at(text: &str) -> DateTime<Utc> {
        parse_timestamp(&RawTimestamp::from(text)).unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        let expected = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();
        assert_eq!(at("2026-10-19T08:30:00Z"), expected);
        assert_eq!(at("2026-10-19T10:30:00+02:00"), expected);
        assert_eq!(at("2026-10-19T08:30:00.000Z"), expected);
        assert_eq!(at("2026-10-19T08:30:00"), expected);
        assert_eq!(at("2026-10-19 08:30:00"), expected);
        assert_eq!(
            at("2026-10-19"),
            Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap()
        );
        assert!(parse_timestamp(&RawTimestamp::from("yesterday")).is_none());
        assert!(parse_timestamp(&RawTimestamp::from("2026-13-40")).is_none());
    }

    #[test]
    fn created_at_takes_precedence_over_join_date() {
        let record = user(Some("2026-10-01"), Some("2026-09-01"));
        assert_eq!(record.resolve_timestamp(), Ok(at("2026-10-01")));

        let fallback = user(None, Some("2026-09-01"));
        assert_eq!(fallback.resolve_timestamp(), Ok(at("2026-09-01")));

        assert_eq!(user(None, None).resolve_timestamp(), Err(SkipReason::MissingDate));
        assert_eq!(
            user(Some("not a date"), Some("2026-09-01")).resolve_timestamp(),
            Err(SkipReason::UnparseableDate("not a date".to_string()))
        );
    }

    #[test]
    fn bounds_are_inclusive_and_order_is_kept() {
        let start = at("2026-10-10T00:00:00Z");
        let end = at("2026-10-17T00:00:00Z");
        let users = vec![
            user(Some("2026-10-17T00:00:00Z"), None),
            user(Some("2026-10-09T23:59:59Z"), None),
            user(Some("2026-10-10T00:00:00Z"), None),
            user(Some("2026-10-12"), None),
            user(Some("2026-10-17T00:00:01Z"), None),
        ];

        let matched = filter_by_date_range(&users, start, end);
        let ids: Vec<Uuid> = matched.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![users[0].id, users[2].id, users[3].id]);
    }

    #[test]
    fn missing_and_malformed_dates_are_excluded() {
        let end = at("2026-10-19T12:00:00Z");
        let start = end - Duration::days(365);
        let users = vec![
            user(None, None),
            user(Some("garbage"), None),
            user(Some(""), Some("2026-10-01")),
            user(None, Some("2026-10-01")),
        ];

        let matched = filter_by_date_range(&users, start, end);
        let ids: Vec<Uuid> = matched.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![users[2].id, users[3].id]);
    }

    #[test]
    fn non_string_values_are_unparseable() {
        let record = UserRecord {
            created_at: Some(RawTimestamp::Other(serde_json::json!(true))),
            ..user(None, Some("2026-10-01"))
        };
        assert_eq!(
            record.resolve_timestamp(),
            Err(SkipReason::UnparseableDate("true".to_string()))
        );
        let end = at("2026-10-19T12:00:00Z");
        assert!(filter_by_date_range(&[record], end - Duration::days(365), end).is_empty());
    }

    #[test]
    fn resolve_or_skip_records_diagnostics() {
        let mut diagnostics = Diagnostics::default();
        let broken = user(Some("31/12/2026"), None);
        assert!(broken.resolve_or_skip(&mut diagnostics).is_none());
        assert_eq!(diagnostics.skipped.len(), 1);
        assert_eq!(diagnostics.skipped[0].kind, RecordKind::User);
        assert_eq!(
            diagnostics.skipped[0].reason,
            SkipReason::UnparseableDate("31/12/2026".to_string())
        );
    }
}
