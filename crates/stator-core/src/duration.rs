//! Short human-readable durations, e.g. "1m0s", "10s", "500ms".
//!
//! Formatting produces the form the discovery agent expects for check
//! intervals. Parsing, for configuration files, is humantime's grammar.

use std::fmt::Write;
use std::time::Duration;

use crate::error::DurationError;

const NANOS_PER_MICRO: u128 = 1_000;
const NANOS_PER_MILLI: u128 = 1_000_000;
const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Render a duration as hours, minutes and (fractional) seconds.
///
/// Minutes are always shown once hours are, and seconds always end the
/// string: 1m → "1m0s", 1h → "1h0m0s". Sub-second values use ms, µs or ns.
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        return "0s".to_string();
    }
    if nanos < NANOS_PER_MICRO {
        return format!("{nanos}ns");
    }
    if nanos < NANOS_PER_MILLI {
        return format!("{}µs", fraction(nanos, NANOS_PER_MICRO));
    }
    if nanos < NANOS_PER_SEC {
        return format!("{}ms", fraction(nanos, NANOS_PER_MILLI));
    }

    let secs = d.as_secs();
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let rest = u128::from(secs % 60) * NANOS_PER_SEC + u128::from(d.subsec_nanos());

    let mut out = String::new();
    if hours > 0 {
        let _ = write!(out, "{hours}h");
    }
    if hours > 0 || minutes > 0 {
        let _ = write!(out, "{minutes}m");
    }
    let _ = write!(out, "{}s", fraction(rest, NANOS_PER_SEC));
    out
}

/// `value / unit` with trailing fractional zeros trimmed.
fn fraction(value: u128, unit: u128) -> String {
    let whole = value / unit;
    let rem = value % unit;
    if rem == 0 {
        return whole.to_string();
    }
    let width = unit.ilog10() as usize;
    let digits = format!("{rem:0width$}");
    format!("{whole}.{}", digits.trim_end_matches('0'))
}

/// Parse a config duration such as "15m", "1m30s" or "500ms".
///
/// A bare "0" is accepted; any other number needs a unit.
pub fn parse_duration(s: &str) -> Result<Duration, DurationError> {
    let input = s.trim();
    if input == "0" {
        return Ok(Duration::ZERO);
    }
    humantime::parse_duration(input).map_err(|source| DurationError {
        input: input.to_string(),
        source,
    })
}

/// Serde adapter for `Duration` fields written as short strings.
///
/// ```ignore
/// #[serde(with = "stator_core::duration::serde")]
/// interval: Duration,
/// ```
pub mod serde {
    use std::time::Duration;

    use ::serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_duration(&raw).map_err(::serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_whole_units() {
        assert_eq!(format_duration(Duration::from_secs(60)), "1m0s");
        assert_eq!(format_duration(Duration::from_secs(10)), "10s");
        assert_eq!(format_duration(Duration::from_secs(30 * 60)), "30m0s");
        assert_eq!(format_duration(Duration::from_secs(15 * 60)), "15m0s");
        assert_eq!(format_duration(Duration::from_secs(3600)), "1h0m0s");
        assert_eq!(format_duration(Duration::from_secs(3661)), "1h1m1s");
        assert_eq!(format_duration(Duration::ZERO), "0s");
    }

    #[test]
    fn format_fractions() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_micros(1500)), "1.5ms");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.5µs");
        assert_eq!(format_duration(Duration::from_nanos(7)), "7ns");
        assert_eq!(format_duration(Duration::from_millis(90_250)), "1m30.25s");
    }

    #[test]
    fn parse_single_units() {
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("10s").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250us").unwrap(), Duration::from_micros(250));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_compound() {
        assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_duration("1h 30m").unwrap(), Duration::from_secs(5400));
        assert_eq!(parse_duration(" 10s ").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn parse_rejects_garbage() {
        for bad in ["", "10", "10x", "m", "soon"] {
            let err = parse_duration(bad).unwrap_err();
            assert_eq!(err.input, bad.trim());
            assert!(err.to_string().starts_with("invalid duration"), "{err}");
        }
    }

    #[test]
    fn parse_reads_what_format_writes() {
        for secs in [1, 10, 60, 90, 900, 1800, 3600, 3661] {
            let d = Duration::from_secs(secs);
            assert_eq!(parse_duration(&format_duration(d)).unwrap(), d);
        }
    }

    #[test]
    fn serde_adapter_in_toml() {
        #[derive(::serde::Deserialize)]
        struct Cfg {
            #[serde(with = "crate::duration::serde")]
            interval: Duration,
        }

        let cfg: Cfg = toml::from_str(r#"interval = "15m""#).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(900));
    }
}
