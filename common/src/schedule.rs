// Cron pattern parsing and next-trigger calculation
//
// The caller contract is a standard 5-field cron expression
// (minute, hour, day of month, month, day of week). The cron crate wants a
// seconds field, so a literal `0` is prepended before parsing.

use crate::errors::ScheduleError;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule as CronSchedule;
use std::str::FromStr;

/// Parse and validate a 5-field cron expression.
pub fn parse_cron_pattern(pattern: &str) -> Result<CronSchedule, ScheduleError> {
    let field_count = pattern.split_whitespace().count();
    if field_count != 5 {
        return Err(ScheduleError::InvalidCronExpression {
            expression: pattern.to_string(),
            reason: format!("expected 5 fields, found {}", field_count),
        });
    }

    let with_seconds = format!("0 {}", pattern.trim());
    CronSchedule::from_str(&with_seconds).map_err(|e| ScheduleError::InvalidCronExpression {
        expression: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Parse an IANA timezone name.
pub fn parse_timezone(name: &str) -> Result<Tz, ScheduleError> {
    Tz::from_str(name).map_err(|_| ScheduleError::InvalidTimezone(name.to_string()))
}

/// Calculate the first trigger instant strictly after `after`, evaluating
/// the pattern in the given timezone.
pub fn next_occurrence(
    pattern: &str,
    timezone: Tz,
    after: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    let schedule = parse_cron_pattern(pattern)?;

    let after_in_tz = after.with_timezone(&timezone);

    let next_in_tz = schedule
        .after(&after_in_tz)
        .next()
        .ok_or_else(|| ScheduleError::NoNextExecution {
            pattern: pattern.to_string(),
        })?;

    Ok(next_in_tz.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_valid_five_field_pattern() {
        assert!(parse_cron_pattern("0 17 * * *").is_ok());
        assert!(parse_cron_pattern("* * * * *").is_ok());
        assert!(parse_cron_pattern("*/5 9-17 * * 1-5").is_ok());
    }

    #[test]
    fn test_parse_rejects_wrong_field_count() {
        // 6-field (with seconds) and 4-field forms are both rejected at
        // this boundary.
        assert!(parse_cron_pattern("0 0 17 * * *").is_err());
        assert!(parse_cron_pattern("17 * * *").is_err());
        assert!(parse_cron_pattern("").is_err());
    }

    #[test]
    fn test_parse_rejects_garbage_fields() {
        let err = parse_cron_pattern("61 25 * * *").unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidCronExpression { .. }
        ));
    }

    #[test]
    fn test_next_occurrence_daily_at_17() {
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let next = next_occurrence("0 17 * * *", chrono_tz::UTC, after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_rolls_to_next_day() {
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 18, 0, 0).unwrap();
        let next = next_occurrence("0 17 * * *", chrono_tz::UTC, after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 11, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_respects_timezone() {
        // 17:00 in Ho Chi Minh City (UTC+7) is 10:00 UTC.
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();
        let tz = parse_timezone("Asia/Ho_Chi_Minh").unwrap();
        let next = next_occurrence("0 17 * * *", tz, after).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2024, 3, 10, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_next_occurrence_every_minute_is_strictly_after() {
        let after = Utc.with_ymd_and_hms(2024, 3, 10, 12, 30, 0).unwrap();
        let next = next_occurrence("* * * * *", chrono_tz::UTC, after).unwrap();
        assert!(next > after);
        assert!((next - after).num_seconds() <= 60);
    }

    #[test]
    fn test_parse_timezone() {
        assert!(parse_timezone("UTC").is_ok());
        assert!(parse_timezone("Europe/London").is_ok());
        assert!(parse_timezone("Nowhere/Nothing").is_err());
    }
}
