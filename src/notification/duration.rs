//! ISO 8601 时长解析
//!
//! 只支持 `PT` 开头的时分秒子集（如 `PT30S`、`PT5M`、`PT1H30M15S`），
//! 用于冷却时间和 HTTP 超时配置。

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// 时长解析错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DurationError {
    #[error("Invalid ISO 8601 duration: \"{0}\". Expected format like PT30S, PT5M, PT1H30M15S.")]
    InvalidFormat(String),
}

/// `PT[nH][nM][nS]`，各分量可带小数，顺序固定
static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^PT(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?$").unwrap()
});

/// 解析 ISO 8601 时长，返回毫秒数
///
/// 缺省的分量按 0 计算，`PT` 本身解析为 0。结果四舍五入到毫秒。
pub fn parse_iso8601_duration(text: &str) -> Result<u64, DurationError> {
    let caps = DURATION_PATTERN
        .captures(text)
        .ok_or_else(|| DurationError::InvalidFormat(text.to_string()))?;

    let component = |idx: usize| -> Result<f64, DurationError> {
        match caps.get(idx) {
            Some(m) => m
                .as_str()
                .parse::<f64>()
                .map_err(|_| DurationError::InvalidFormat(text.to_string())),
            None => Ok(0.0),
        }
    };

    let hours = component(1)?;
    let minutes = component(2)?;
    let seconds = component(3)?;

    let millis = ((hours * 3600.0 + minutes * 60.0 + seconds) * 1000.0).round();
    Ok(millis as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_seconds() {
        assert_eq!(parse_iso8601_duration("PT5S").unwrap(), 5000);
    }

    #[test]
    fn test_parse_minutes() {
        assert_eq!(parse_iso8601_duration("PT2M").unwrap(), 120_000);
    }

    #[test]
    fn test_parse_hours() {
        assert_eq!(parse_iso8601_duration("PT1H").unwrap(), 3_600_000);
    }

    #[test]
    fn test_parse_combined() {
        assert_eq!(parse_iso8601_duration("PT1H30M15S").unwrap(), 5_415_000);
        assert_eq!(parse_iso8601_duration("PT5M30S").unwrap(), 330_000);
    }

    #[test]
    fn test_parse_zero() {
        assert_eq!(parse_iso8601_duration("PT0S").unwrap(), 0);
        // 只有前缀也能匹配，结果为 0
        assert_eq!(parse_iso8601_duration("PT").unwrap(), 0);
    }

    #[test]
    fn test_parse_fractional() {
        assert_eq!(parse_iso8601_duration("PT1.5S").unwrap(), 1500);
        assert_eq!(parse_iso8601_duration("PT0.5M").unwrap(), 30_000);
        assert_eq!(parse_iso8601_duration("PT0.0004S").unwrap(), 0);
    }

    #[test]
    fn test_reject_invalid() {
        for input in ["5000", "invalid", "", "P5S", "PT5s", "PT5S5M", "PT1M1H", "PT5S ", " PT5S", "PT.5S"] {
            assert!(
                parse_iso8601_duration(input).is_err(),
                "{:?} should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_error_carries_input() {
        let err = parse_iso8601_duration("5 minutes").unwrap_err();
        assert_eq!(err, DurationError::InvalidFormat("5 minutes".to_string()));
        let msg = err.to_string();
        assert!(msg.contains("\"5 minutes\""));
        assert!(msg.contains("PT30S"));
    }
}
