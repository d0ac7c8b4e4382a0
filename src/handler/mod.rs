//! 日志输出与诊断通道

use std::any::Any;
use std::io;

use crate::config::Level;

/// 日志输出 trait
pub trait LogOutput: Send + Sync + Any {
    /// 写入一条已格式化的记录
    fn write_record(&self, data: &[u8]) -> io::Result<()>;

    /// 刷新输出
    fn flush(&self) -> io::Result<()>;

    /// 获取输出类型
    fn output_type(&self) -> OutputType;

    /// 类型安全的向下转型
    fn as_any(&self) -> &dyn Any;
}

/// 输出类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    Terminal,
    File,
    Writer,
}

/// 引擎自身故障的上报通道
///
/// 轮转、压缩、清理中的失败都经由此处上报，从不传播到写入路径。
pub trait Diagnostics: Send + Sync {
    fn report(&self, level: Level, message: &str);
}

/// 未挂接日志器时的兜底通道，直接写 stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrDiagnostics;

impl Diagnostics for StderrDiagnostics {
    fn report(&self, level: Level, message: &str) {
        eprintln!("[rat_rotatelog] {}{}", level.tag(), message);
    }
}

pub mod term;
pub mod file;
pub mod compress;
pub mod retention;

pub use term::{SharedBuffer, TermOutput, WriterOutput};
pub use file::{EngineOptions, RotateOutcome, RotationEngine};
pub use compress::{CompressOutcome, CompressionWorker};
pub use retention::{RetentionSweeper, SweepReport};
