//! Duration values with an infinite sentinel.
//!
//! Config files write durations as `humantime` literals (`"5s"`, `"250ms"`,
//! `"2h"`), a bare integer meaning milliseconds, or the literal `"infinite"`.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// A configuration duration: finite, or the unbounded `infinite` sentinel.
///
/// `Infinite` compares strictly greater than every finite duration, so
/// timeout comparisons like `deadline < config_timeout` behave as expected
/// when the timeout is unbounded. The ordering falls out of the variant
/// order in the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigDuration {
    Finite(Duration),
    Infinite,
}

impl ConfigDuration {
    pub const ZERO: ConfigDuration = ConfigDuration::Finite(Duration::ZERO);

    pub fn from_millis(ms: u64) -> Self {
        ConfigDuration::Finite(Duration::from_millis(ms))
    }

    pub fn from_secs(secs: u64) -> Self {
        ConfigDuration::Finite(Duration::from_secs(secs))
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, ConfigDuration::Infinite)
    }

    /// Milliseconds for a finite duration, `None` for `Infinite`.
    pub fn as_millis(&self) -> Option<u128> {
        match self {
            ConfigDuration::Finite(d) => Some(d.as_millis()),
            ConfigDuration::Infinite => None,
        }
    }

    /// The underlying `std` duration, `None` for `Infinite`.
    pub fn as_std(&self) -> Option<Duration> {
        match self {
            ConfigDuration::Finite(d) => Some(*d),
            ConfigDuration::Infinite => None,
        }
    }
}

impl From<Duration> for ConfigDuration {
    fn from(d: Duration) -> Self {
        ConfigDuration::Finite(d)
    }
}

impl FromStr for ConfigDuration {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("infinite") {
            return Ok(ConfigDuration::Infinite);
        }
        // A bare integer is milliseconds; anything else goes through humantime.
        if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            let ms: u64 = trimmed
                .parse()
                .map_err(|_| format!("duration '{trimmed}' out of range"))?;
            return Ok(ConfigDuration::from_millis(ms));
        }
        humantime::parse_duration(trimmed)
            .map(ConfigDuration::Finite)
            .map_err(|e| format!("invalid duration '{trimmed}': {e}"))
    }
}

impl fmt::Display for ConfigDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigDuration::Finite(d) => write!(f, "{}", humantime::format_duration(*d)),
            ConfigDuration::Infinite => write!(f, "infinite"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_unit() {
        let d: ConfigDuration = "5s".parse().unwrap();
        assert_eq!(d.as_millis(), Some(5000));
    }

    #[test]
    fn test_parse_bare_integer_is_millis() {
        let d: ConfigDuration = "1500".parse().unwrap();
        assert_eq!(d, ConfigDuration::from_millis(1500));
    }

    #[test]
    fn test_parse_infinite() {
        let d: ConfigDuration = "infinite".parse().unwrap();
        assert!(d.is_infinite());
        assert_eq!(d.as_millis(), None);
    }

    #[test]
    fn test_infinite_greater_than_any_finite() {
        let week = ConfigDuration::from_secs(7 * 24 * 3600);
        assert!(ConfigDuration::Infinite > week);
        assert!(ConfigDuration::Infinite > ConfigDuration::Finite(Duration::MAX));
        assert!(week < ConfigDuration::Infinite);
    }

    #[test]
    fn test_finite_ordering() {
        assert!(ConfigDuration::from_millis(10) < ConfigDuration::from_millis(20));
        assert_eq!(
            "5s".parse::<ConfigDuration>().unwrap(),
            "5000".parse::<ConfigDuration>().unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("soon".parse::<ConfigDuration>().is_err());
        assert!("".parse::<ConfigDuration>().is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        assert_eq!(ConfigDuration::Infinite.to_string(), "infinite");
        assert_eq!(ConfigDuration::from_secs(5).to_string(), "5s");
    }
}
