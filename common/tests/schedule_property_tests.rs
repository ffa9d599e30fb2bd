// Property-based tests for cron pattern handling

use chrono::{TimeZone, Utc};
use common::schedule::{next_occurrence, parse_cron_pattern};
use proptest::prelude::*;

// Strategies producing syntactically valid 5-field cron expressions from a
// constrained grammar (wildcards, single values, steps).
fn stepped_field(min: u32, max: u32) -> BoxedStrategy<String> {
    prop_oneof![
        Just("*".to_string()),
        (min..=max).prop_map(|v| v.to_string()),
        (2..=6u32).prop_map(|step| format!("*/{}", step)),
    ]
    .boxed()
}

fn plain_field(min: u32, max: u32) -> BoxedStrategy<String> {
    prop_oneof![
        Just("*".to_string()),
        (min..=max).prop_map(|v| v.to_string()),
    ]
    .boxed()
}

fn cron_pattern() -> impl Strategy<Value = String> {
    (
        stepped_field(0, 59),
        stepped_field(0, 23),
        plain_field(1, 28),
        plain_field(1, 12),
        plain_field(1, 6),
    )
        .prop_map(|(m, h, dom, mon, dow)| format!("{} {} {} {} {}", m, h, dom, mon, dow))
}

proptest! {
    // Every expression from the 5-field grammar parses.
    #[test]
    fn prop_five_field_patterns_parse(pattern in cron_pattern()) {
        prop_assert!(parse_cron_pattern(&pattern).is_ok(), "pattern {:?} rejected", pattern);
    }

    // Anything with a field count other than 5 is rejected up front.
    #[test]
    fn prop_wrong_field_count_rejected(fields in prop::collection::vec("[0-9*]{1,2}", 0..9)) {
        prop_assume!(fields.len() != 5);
        let pattern = fields.join(" ");
        prop_assert!(parse_cron_pattern(&pattern).is_err());
    }

    // The next occurrence is always strictly after the reference instant.
    #[test]
    fn prop_next_occurrence_strictly_after(pattern in cron_pattern(), offset_secs in 0i64..86_400) {
        let after = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
            + chrono::Duration::seconds(offset_secs);
        if let Ok(next) = next_occurrence(&pattern, chrono_tz::UTC, after) {
            prop_assert!(next > after);
        }
    }

    // Repeatedly chaining next_occurrence yields strictly increasing
    // trigger times (the per-rule monotonicity the engine relies on).
    #[test]
    fn prop_trigger_times_monotonic(offset_secs in 0i64..86_400) {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
            + chrono::Duration::seconds(offset_secs);
        let mut current = start;
        for _ in 0..5 {
            let next = next_occurrence("*/5 * * * *", chrono_tz::UTC, current).unwrap();
            prop_assert!(next > current);
            current = next;
        }
    }
}
