//! 归档后缀时钟 - 将时间截断到轮转周期并渲染为定宽数字标签

use chrono::{DateTime, NaiveDate, Utc};
use std::time::Duration;

use crate::error::{Result, RotateError};

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

/// 后缀粒度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Second,
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// 选出能整除周期的最粗粒度，都不满足时退回到秒
    pub fn for_bucket(bucket: Duration) -> Granularity {
        let secs = bucket.as_secs();
        [Granularity::Day, Granularity::Hour, Granularity::Minute]
            .into_iter()
            .find(|g| secs >= g.seconds() && secs % g.seconds() == 0)
            .unwrap_or(Granularity::Second)
    }

    pub fn seconds(&self) -> u64 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => SECS_PER_MINUTE,
            Granularity::Hour => SECS_PER_HOUR,
            Granularity::Day => SECS_PER_DAY,
        }
    }

    /// chrono 格式串
    pub fn pattern(&self) -> &'static str {
        match self {
            Granularity::Second => "%Y%m%d%H%M%S",
            Granularity::Minute => "%Y%m%d%H%M",
            Granularity::Hour => "%Y%m%d%H",
            Granularity::Day => "%Y%m%d",
        }
    }

    /// 标签位数
    pub fn width(&self) -> usize {
        match self {
            Granularity::Second => 14,
            Granularity::Minute => 12,
            Granularity::Hour => 10,
            Granularity::Day => 8,
        }
    }
}

/// 由轮转周期推导出的后缀时钟
///
/// 截断以 Unix 纪元为基准，按 UTC 渲染，因此同一周期内的任意时间得到同一标签，
/// 且标签随时间单调不减（不受夏令时影响）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuffixClock {
    bucket_secs: i64,
    granularity: Granularity,
}

impl SuffixClock {
    /// `bucket` 应已通过 [`crate::RotationConfig::validate`]
    pub fn new(bucket: Duration) -> Self {
        let secs = bucket.as_secs().max(1);
        Self {
            bucket_secs: i64::try_from(secs).unwrap_or(i64::MAX),
            granularity: Granularity::for_bucket(Duration::from_secs(secs)),
        }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn pattern(&self) -> &'static str {
        self.granularity.pattern()
    }

    pub fn width(&self) -> usize {
        self.granularity.width()
    }

    pub fn bucket(&self) -> Duration {
        Duration::from_secs(self.bucket_secs as u64)
    }

    /// 截断到所在周期的起点
    pub fn truncate(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let start = t.timestamp().div_euclid(self.bucket_secs) * self.bucket_secs;
        DateTime::from_timestamp(start, 0).unwrap_or(t)
    }

    pub fn label_at(&self, t: DateTime<Utc>) -> String {
        self.truncate(t).format(self.pattern()).to_string()
    }

    pub fn label_now(&self) -> String {
        self.label_at(Utc::now())
    }

    /// 下一个周期边界
    pub fn next_boundary_after(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.truncate(t) + chrono::Duration::seconds(self.bucket_secs)
    }

    /// 将标签解析回周期起点
    pub fn parse_label(&self, label: &str) -> Result<DateTime<Utc>> {
        if label.len() != self.width() {
            return Err(RotateError::parse(
                label,
                format!("expected {} digits, found {}", self.width(), label.len()),
            ));
        }
        if !label.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RotateError::parse(label, "non-digit character"));
        }

        // 补齐到秒级后按固定位置切分
        let mut digits = label.to_string();
        while digits.len() < Granularity::Second.width() {
            digits.push('0');
        }
        let field = |range: std::ops::Range<usize>| -> u32 {
            digits[range].parse::<u32>().unwrap_or(u32::MAX)
        };

        let year = field(0..4) as i32;
        NaiveDate::from_ymd_opt(year, field(4..6), field(6..8))
            .and_then(|date| date.and_hms_opt(field(8..10), field(10..12), field(12..14)))
            .map(|naive| naive.and_utc())
            .ok_or_else(|| RotateError::parse(label, "not a valid calendar time"))
    }
}
