//! 配置模块

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::RotateError;

/// 最小轮转粒度
pub const MIN_BUCKET_DURATION: Duration = Duration::from_secs(1);

/// 日志级别，从低到高排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum Level {
    Debug = 0,
    Info = 1,
    Notice = 2,
    Warning = 3,
    Error = 4,
    Critical = 5,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    /// 按名称取级别，未知名称一律视为 Error
    pub fn from_name(name: &str) -> Level {
        name.parse().unwrap_or(Level::Error)
    }

    /// 固定的级别标签，带尾随空格
    pub fn tag(&self) -> &'static str {
        match self {
            Level::Debug => "[Debug] ",
            Level::Info => "[Info] ",
            Level::Notice => "[Notice] ",
            Level::Warning => "[Warning] ",
            Level::Error => "[Error] ",
            Level::Critical => "[Critical] ",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    pub(crate) fn from_u8(value: u8) -> Level {
        match value {
            0 => Level::Debug,
            1 => Level::Info,
            2 => Level::Notice,
            3 => Level::Warning,
            4 => Level::Error,
            _ => Level::Critical,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Level {
    type Err = RotateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Level::ALL
            .iter()
            .copied()
            .find(|level| level.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| RotateError::Config(format!("unknown log level `{}`", s)))
    }
}

/// 轮转配置
///
/// 配置一经应用即不可变；非法值在 [`RotationConfig::validate`] 中直接拒绝，不做任何修正。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationConfig {
    /// 轮转周期，必须为整秒且不小于 1 秒
    #[serde(with = "duration_secs")]
    pub bucket_duration: Duration,
    /// 保留的归档周期数
    pub retain_count: u32,
    /// 归档后是否 gzip 压缩
    pub compress: bool,
}

impl RotationConfig {
    pub fn new(bucket_duration: Duration, retain_count: u32, compress: bool) -> Self {
        Self {
            bucket_duration,
            retain_count,
            compress,
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), RotateError> {
        if self.retain_count == 0 {
            return Err(RotateError::Config("retain_count must be at least 1".to_string()));
        }
        if self.bucket_duration.is_zero() {
            return Err(RotateError::Config("bucket_duration must be positive".to_string()));
        }
        if self.bucket_duration < MIN_BUCKET_DURATION {
            return Err(RotateError::Config(format!(
                "bucket_duration {:?} is below the minimum granularity of {:?}",
                self.bucket_duration, MIN_BUCKET_DURATION
            )));
        }
        if self.bucket_duration.subsec_nanos() != 0 {
            return Err(RotateError::Config(format!(
                "bucket_duration {:?} must be a whole number of seconds",
                self.bucket_duration
            )));
        }
        Ok(())
    }

    /// 保留窗口 = 周期 × 保留数
    pub fn retention_window(&self) -> Duration {
        self.bucket_duration * self.retain_count
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            bucket_duration: Duration::from_secs(24 * 60 * 60),
            retain_count: 7,
            compress: true,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order_and_tags() {
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Notice);
        assert!(Level::Notice < Level::Warning);
        assert!(Level::Error < Level::Critical);
        assert_eq!(Level::Warning.tag(), "[Warning] ");
        assert_eq!(Level::Critical.to_string(), "[Critical] ");
    }

    #[test]
    fn test_level_from_name() {
        assert_eq!(Level::from_name("debug"), Level::Debug);
        assert_eq!(Level::from_name("notice"), Level::Notice);
        assert_eq!(Level::from_name("WARNING"), Level::Warning);
        assert_eq!(Level::from_name("verbose"), Level::Error);
        assert!("verbose".parse::<Level>().is_err());
        for level in Level::ALL {
            assert_eq!(Level::from_u8(level as u8), level);
        }
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let ok = RotationConfig::new(Duration::from_secs(60), 3, false);
        assert!(ok.validate().is_ok());

        let zero_retain = RotationConfig { retain_count: 0, ..ok.clone() };
        assert!(matches!(zero_retain.validate(), Err(RotateError::Config(_))));

        let zero_bucket = RotationConfig { bucket_duration: Duration::ZERO, ..ok.clone() };
        assert!(matches!(zero_bucket.validate(), Err(RotateError::Config(_))));

        let too_fine = RotationConfig { bucket_duration: Duration::from_millis(500), ..ok.clone() };
        assert!(matches!(too_fine.validate(), Err(RotateError::Config(_))));

        let fractional = RotationConfig { bucket_duration: Duration::from_millis(1500), ..ok };
        assert!(matches!(fractional.validate(), Err(RotateError::Config(_))));
    }

    #[test]
    fn test_retention_window() {
        let config = RotationConfig::new(Duration::from_secs(3600), 2, true);
        assert_eq!(config.retention_window(), Duration::from_secs(7200));
    }

    #[test]
    fn test_config_serde_uses_seconds() {
        let config: RotationConfig =
            serde_json::from_str(r#"{"bucket_duration":3600,"retain_count":24,"compress":true}"#).unwrap();
        assert_eq!(config.bucket_duration, Duration::from_secs(3600));
        assert_eq!(config.retain_count, 24);
        assert!(config.compress);

        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"bucket_duration\":3600"));
    }
}
