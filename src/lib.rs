//! rat_rotatelog - 按时间周期轮转的分级日志库
//!
//! 活动文件按配置的周期切换为带时间标签的归档（`<path>.<label>`），归档可选 gzip
//! 压缩（`<path>.<label>.gz`），超过 `周期 × 保留数` 的归档由后台任务清理。
//!
//! ```no_run
//! use std::time::Duration;
//! use rat_rotatelog::{LoggerBuilder, Level, RotationConfig};
//!
//! let logger = LoggerBuilder::new()
//!     .with_level(Level::Info)
//!     .with_rotation("./logs/app.log", RotationConfig::new(Duration::from_secs(3600), 24, true))
//!     .build()?;
//! logger.start_rotate()?;
//!
//! rat_rotatelog::info!(logger, "listening on {}", 8080);
//! rat_rotatelog::debug!(logger, "not written at Info level");
//! # Ok::<(), rat_rotatelog::RotateError>(())
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod handler;
pub mod scheduler;
pub mod suffix;

// 重新导出主要类型
pub use crate::config::{Level, RotationConfig};
pub use crate::core::{Logger, LoggerBuilder};
pub use crate::error::{Result, RotateError};
pub use crate::handler::{
    CompressOutcome, CompressionWorker, Diagnostics, EngineOptions, LogOutput, RetentionSweeper,
    RotateOutcome, RotationEngine, SharedBuffer, SweepReport, TermOutput, WriterOutput,
};
pub use crate::scheduler::{RotationScheduler, SchedulerState};
pub use crate::suffix::{Granularity, SuffixClock};

// 日志宏，第一个参数为日志器
#[macro_export]
macro_rules! critical {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Critical, $($arg)*));
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Error, $($arg)*));
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Warning, $($arg)*));
}

#[macro_export]
macro_rules! notice {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Notice, $($arg)*));
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Info, $($arg)*));
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)*) => ($crate::log!($logger, $crate::Level::Debug, $($arg)*));
}

/// 先判断级别，再格式化
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)*) => {{
        let logger: &$crate::Logger = &$logger;
        let level: $crate::Level = $level;
        if logger.enabled(level) {
            logger.log(level, format_args!($($arg)*));
        }
    }};
}
