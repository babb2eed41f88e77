//! Human-readable duration buckets for completion estimates.

const MINUTE_MS: u64 = 60_000;
const HOUR_MS: u64 = 3_600_000;

/// Formats a remaining-time estimate into coarse operator-facing buckets.
///
/// Estimates extrapolated from noisy partial progress do not deserve more
/// precision than "about N minutes".
pub fn format_duration(ms: u64) -> String {
    if ms < MINUTE_MS {
        return "less than a minute".to_string();
    }
    if ms < HOUR_MS {
        let minutes = ms.div_ceil(MINUTE_MS);
        return format!("about {} {}", minutes, pluralize(minutes, "minute"));
    }

    let hours = ms / HOUR_MS;
    let minutes = (ms % HOUR_MS).div_ceil(MINUTE_MS);
    let mut formatted = format!("about {} {}", hours, pluralize(hours, "hour"));
    if minutes > 0 {
        formatted.push_str(&format!(" and {} {}", minutes, pluralize(minutes, "minute")));
    }
    formatted
}

fn pluralize(count: u64, unit: &str) -> String {
    if count == 1 {
        unit.to_string()
    } else {
        format!("{unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute_bucket() {
        assert_eq!(format_duration(0), "less than a minute");
        assert_eq!(format_duration(30_000), "less than a minute");
        assert_eq!(format_duration(59_999), "less than a minute");
    }

    #[test]
    fn minute_buckets_round_up() {
        assert_eq!(format_duration(60_000), "about 1 minute");
        assert_eq!(format_duration(61_000), "about 2 minutes");
        assert_eq!(format_duration(120_000), "about 2 minutes");
        assert_eq!(format_duration(3_599_999), "about 60 minutes");
    }

    #[test]
    fn hour_buckets_carry_minute_remainder() {
        assert_eq!(format_duration(3_600_000), "about 1 hour");
        assert_eq!(format_duration(3_660_000), "about 1 hour and 1 minute");
        assert_eq!(format_duration(7_200_000), "about 2 hours");
        assert_eq!(format_duration(7_380_000), "about 2 hours and 3 minutes");
    }
}
