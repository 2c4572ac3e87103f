//! Formatting helpers for human-readable byte sizes, speeds and titles.

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Formats a byte count as a human-readable string (B, KB, MB, GB, TB).
///
/// Zero, negative and non-finite values all render as `"0.00 B"`. TB is the
/// largest unit; anything bigger is expressed as a large TB figure.
#[must_use]
pub fn format_bytes(value: f64) -> String {
    if !value.is_finite() || value <= 0.0 {
        return "0.00 B".to_string();
    }

    let mut magnitude = value;
    for unit in &UNITS[..UNITS.len() - 1] {
        if magnitude < 1024.0 {
            return format!("{magnitude:.2} {unit}");
        }
        magnitude /= 1024.0;
    }
    format!("{magnitude:.2} {}", UNITS[UNITS.len() - 1])
}

/// Formats a transfer rate, or `"N/A"` when the backend did not report one.
#[must_use]
pub fn format_speed(bytes_per_sec: Option<f64>) -> String {
    match bytes_per_sec {
        Some(speed) if speed.is_finite() && speed > 0.0 => format!("{}/s", format_bytes(speed)),
        _ => "N/A".to_string(),
    }
}

/// Formats an ETA in whole seconds, or `"?"` when unknown.
#[must_use]
pub fn format_eta(eta_secs: Option<u64>) -> String {
    match eta_secs {
        Some(secs) if secs > 0 => format!("{secs}s"),
        _ => "?".to_string(),
    }
}

/// Shortens `text` to at most `limit` characters, appending `...` when cut.
#[must_use]
pub fn elide(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let head: String = text.chars().take(limit).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(500.0), "500.00 B");
        assert_eq!(format_bytes(1024.0), "1.00 KB");
        assert_eq!(format_bytes(1536.0), "1.50 KB");
        assert_eq!(format_bytes(1_048_576.0), "1.00 MB");
        assert_eq!(format_bytes(1_073_741_824.0), "1.00 GB");
        assert_eq!(format_bytes(1_099_511_627_776.0), "1.00 TB");
    }

    #[test]
    fn format_bytes_zero_and_invalid() {
        assert_eq!(format_bytes(0.0), "0.00 B");
        assert_eq!(format_bytes(-12.0), "0.00 B");
        assert_eq!(format_bytes(f64::NAN), "0.00 B");
        assert_eq!(format_bytes(f64::INFINITY), "0.00 B");
    }

    #[test]
    fn format_bytes_caps_at_tb() {
        assert_eq!(format_bytes(1024.0 * 1_099_511_627_776.0), "1024.00 TB");
    }

    #[test]
    fn format_speed_and_eta() {
        assert_eq!(format_speed(Some(2048.0)), "2.00 KB/s");
        assert_eq!(format_speed(Some(0.0)), "N/A");
        assert_eq!(format_speed(None), "N/A");
        assert_eq!(format_eta(Some(42)), "42s");
        assert_eq!(format_eta(Some(0)), "?");
        assert_eq!(format_eta(None), "?");
    }

    #[test]
    fn elide_long_titles() {
        assert_eq!(elide("short", 60), "short");
        let long = "x".repeat(61);
        assert_eq!(elide(&long, 60), format!("{}...", "x".repeat(60)));
        let exact = "y".repeat(60);
        assert_eq!(elide(&exact, 60), exact);
    }

    #[test]
    fn elide_counts_chars_not_bytes() {
        let title = "é".repeat(61);
        assert_eq!(elide(&title, 60).chars().count(), 63);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn unit_rank(formatted: &str) -> usize {
            let unit = formatted.rsplit(' ').next().unwrap_or_default();
            UNITS.iter().position(|u| *u == unit).unwrap()
        }

        proptest! {
            #[test]
            fn format_bytes_never_panics(value in proptest::num::f64::ANY) {
                let _ = format_bytes(value);
            }

            #[test]
            fn format_bytes_units_are_monotonic(a in 1u64..1_000_000_000_000, b in 1u64..1_000_000_000_000) {
                let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                #[allow(clippy::cast_precision_loss)]
                let (lo, hi) = (lo as f64, hi as f64);
                prop_assert!(unit_rank(&format_bytes(lo)) <= unit_rank(&format_bytes(hi)));
            }

            #[test]
            fn format_bytes_magnitude_below_1024_until_tb(value in 1.0f64..1.0e15) {
                let formatted = format_bytes(value);
                let number: f64 = formatted.split(' ').next().unwrap().parse().unwrap();
                // Two-decimal rounding can print 1023.996 as "1024.00".
                prop_assert!(number <= 1024.0 || formatted.ends_with("TB"));
            }
        }
    }
}
