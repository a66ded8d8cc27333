//! Date heuristics: total validation and pt-BR relative expressions.
//!
//! Every date-bearing field passes through `ensure_valid_date` before storage
//! or display; it never fails and never returns an invalid instant. Relative
//! keywords ("ontem"/"hoje"/"amanhã") and day-first numeric dates are resolved
//! against a reference timezone so "yesterday" means the user's yesterday,
//! not the server's.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// `DD/MM` or `DD/MM/YYYY`; two-digit years get 2000 added.
static DAY_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})(?:/(\d{2,4}))?").unwrap());

/// Coerce an optional date string into a valid instant, substituting `now`
/// when the input is missing or unparseable. Accepts RFC 3339 and bare
/// `YYYY-MM-DD` (taken as UTC midnight).
pub fn ensure_valid_date(value: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(raw) = value else {
        return now;
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return now;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN));
    }
    now
}

/// Timezone-anchored resolver for relative date expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolver {
    tz: Tz,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self {
            tz: chrono_tz::America::Sao_Paulo,
        }
    }
}

impl DateResolver {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Build from an IANA name like "America/Sao_Paulo"; None when unknown.
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse::<Tz>().ok().map(Self::new)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Resolve a relative or day-first date mentioned in free text.
    ///
    /// Keyword priority: "ontem" > "hoje" > "amanhã"/"amanha" (first hit
    /// wins), then a `DD/MM[/YYYY]` pattern resolved to local midnight.
    /// Returns None when the text mentions no date; callers default to `now`.
    pub fn parse_relative_expression(&self, text: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let lower = text.to_lowercase();

        if lower.contains("ontem") {
            return Some(now - Duration::days(1));
        }
        if lower.contains("hoje") {
            return Some(now);
        }
        if lower.contains("amanhã") || lower.contains("amanha") {
            return Some(now + Duration::days(1));
        }

        let caps = DAY_MONTH_RE.captures(&lower)?;
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let mut year: i32 = match caps.get(3) {
            Some(y) => y.as_str().parse().ok()?,
            None => now.with_timezone(&self.tz).year(),
        };
        if year < 100 {
            year += 2000;
        }

        let date = NaiveDate::from_ymd_opt(year, month, day)?;
        // Local midnight; earliest() keeps this total across DST gaps.
        let local = self
            .tz
            .from_local_datetime(&date.and_time(NaiveTime::MIN))
            .earliest()?;
        Some(local.with_timezone(&Utc))
    }

    /// Label for the month `now` falls in, e.g. "2026-08".
    pub fn current_month(&self, now: DateTime<Utc>) -> String {
        now.with_timezone(&self.tz).format("%Y-%m").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        // 15:00 UTC = 12:00 in São Paulo (UTC-3).
        Utc.with_ymd_and_hms(2026, 8, 25, 15, 0, 0).unwrap()
    }

    #[test]
    fn test_ensure_valid_date_is_total() {
        let now = fixed_now();
        assert_eq!(ensure_valid_date(None, now), now);
        assert_eq!(ensure_valid_date(Some(""), now), now);
        assert_eq!(ensure_valid_date(Some("not a date"), now), now);
    }

    #[test]
    fn test_ensure_valid_date_parses_exact_values() {
        let now = fixed_now();
        let d = ensure_valid_date(Some("2024-01-15"), now);
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());

        let rfc = ensure_valid_date(Some("2024-01-15T10:30:00-03:00"), now);
        assert_eq!(rfc, Utc.with_ymd_and_hms(2024, 1, 15, 13, 30, 0).unwrap());
    }

    #[test]
    fn test_keyword_priority() {
        let r = DateResolver::default();
        let now = fixed_now();

        assert_eq!(r.parse_relative_expression("mercado ontem", now), Some(now - Duration::days(1)));
        assert_eq!(r.parse_relative_expression("almoço hoje", now), Some(now));
        assert_eq!(r.parse_relative_expression("cinema amanhã", now), Some(now + Duration::days(1)));
        assert_eq!(r.parse_relative_expression("cinema amanha", now), Some(now + Duration::days(1)));

        // "ontem" outranks a numeric date in the same text.
        assert_eq!(r.parse_relative_expression("ontem 10/08", now), Some(now - Duration::days(1)));
    }

    #[test]
    fn test_day_month_patterns() {
        let r = DateResolver::default();
        let now = fixed_now();

        // Current year assumed; midnight in São Paulo is 03:00 UTC.
        let d = r.parse_relative_expression("compra 10/08", now).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2026, 8, 10, 3, 0, 0).unwrap());

        let d = r.parse_relative_expression("compra 05/03/2024", now).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 5, 3, 0, 0).unwrap());

        // Two-digit year expands to 20xx.
        let d = r.parse_relative_expression("compra 05/03/24", now).unwrap();
        assert_eq!(d, Utc.with_ymd_and_hms(2024, 3, 5, 3, 0, 0).unwrap());
    }

    #[test]
    fn test_no_date_mentions_yield_none() {
        let r = DateResolver::default();
        let now = fixed_now();
        assert_eq!(r.parse_relative_expression("mercado 50 reais", now), None);
        assert_eq!(r.parse_relative_expression("picolé 45/99", now), None); // invalid calendar day
    }

    #[test]
    fn test_current_month_uses_timezone() {
        let r = DateResolver::default();
        // 01:00 UTC on the 1st is still the previous month in São Paulo.
        let now = Utc.with_ymd_and_hms(2026, 9, 1, 1, 0, 0).unwrap();
        assert_eq!(r.current_month(now), "2026-08");
    }
}
