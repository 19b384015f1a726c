//! Parsing of configured token lifetimes

use once_cell::sync::Lazy;
use regex::Regex;

use tg_shared::ExpirySetting;

use crate::errors::ConfigError;

static EXPIRY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)([smhd])$").unwrap()
});

/// Token lifetime in seconds
///
/// Accepts a raw number of seconds or `<integer><unit>` with unit `s`, `m`,
/// `h` or `d`. Anything else, including a zero lifetime, is rejected.
pub fn parse_expiry(setting: &ExpirySetting) -> Result<u64, ConfigError> {
    let invalid = || ConfigError::InvalidExpiry {
        value: setting.to_string(),
    };

    let seconds = match setting {
        ExpirySetting::Seconds(seconds) => *seconds,
        ExpirySetting::Text(text) => {
            let captures = EXPIRY_PATTERN.captures(text).ok_or_else(invalid)?;
            let value: u64 = captures[1].parse().map_err(|_| invalid())?;
            let unit = match &captures[2] {
                "s" => 1,
                "m" => 60,
                "h" => 3_600,
                "d" => 86_400,
                _ => return Err(invalid()),
            };
            value.checked_mul(unit).ok_or_else(invalid)?
        }
    };

    // Lifetimes are added to i64 timestamps.
    if seconds == 0 || i64::try_from(seconds).is_err() {
        return Err(invalid());
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<u64, ConfigError> {
        parse_expiry(&ExpirySetting::from(text))
    }

    #[test]
    fn test_units() {
        assert_eq!(parse("30s").unwrap(), 30);
        assert_eq!(parse("15m").unwrap(), 900);
        assert_eq!(parse("1h").unwrap(), 3_600);
        assert_eq!(parse("7d").unwrap(), 604_800);
        assert_eq!(parse_expiry(&ExpirySetting::Seconds(42)).unwrap(), 42);
    }

    #[test]
    fn test_rejects_malformed() {
        for text in ["", "15", "m", "1.5h", "10w", " 1h", "1h ", "-1m", "1H"] {
            assert!(
                matches!(parse(text), Err(ConfigError::InvalidExpiry { .. })),
                "accepted {:?}",
                text
            );
        }
    }

    #[test]
    fn test_rejects_zero_and_overflow() {
        assert!(parse("0m").is_err());
        assert!(parse_expiry(&ExpirySetting::Seconds(0)).is_err());
        assert!(parse("99999999999999999999d").is_err());
        assert!(parse_expiry(&ExpirySetting::Seconds(u64::MAX)).is_err());
    }

    #[test]
    fn test_error_names_value() {
        let error = parse("soon").unwrap_err();
        assert_eq!(error.to_string(), "Invalid expiry format: soon");
    }
}
