/// Inclusive date range over the `data` attribute.
///
/// Bounds are opaque strings compared lexicographically by the store. No parsing
/// or ordering check happens here; callers that start from chrono values can use
/// the helper constructors, which emit sortable ISO-8601 text.
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateRange {
    start: String,
    end: String,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }

    /// `YYYY-MM-DD` bounds.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self::new(
            start.format("%Y-%m-%d").to_string(),
            end.format("%Y-%m-%d").to_string(),
        )
    }

    /// RFC 3339 bounds with second precision and a `Z` suffix.
    pub fn from_datetimes(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::new(
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }

    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_keeps_bounds_verbatim() {
        let range = DateRange::new("2023-01-01", "2023-12-31");
        assert_eq!(range.start(), "2023-01-01");
        assert_eq!(range.end(), "2023-12-31");
    }

    // 逆順の境界も検証せずに受け付ける
    #[test]
    fn test_reversed_bounds_are_not_rejected() {
        let range = DateRange::new("2024", "2023");
        assert_eq!(range.start(), "2024");
        assert_eq!(range.end(), "2023");
    }

    #[test]
    fn test_from_dates_zero_pads() {
        let range = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
        );
        assert_eq!(range.start(), "2023-01-05");
        assert_eq!(range.end(), "2023-12-31");
    }

    #[test]
    fn test_from_datetimes_uses_utc_suffix() {
        let range = DateRange::from_datetimes(
            Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap(),
        );
        assert_eq!(range.start(), "2023-01-01T00:00:00Z");
        assert_eq!(range.end(), "2023-12-31T23:59:59Z");
    }

    // 生成した文字列の辞書順が時間順と一致する
    #[test]
    fn test_lexicographic_order_matches_time_order() {
        let earlier = DateRange::from_dates(
            NaiveDate::from_ymd_opt(2023, 2, 9).unwrap(),
            NaiveDate::from_ymd_opt(2023, 2, 10).unwrap(),
        );
        assert!(earlier.start() < earlier.end());
    }
}
