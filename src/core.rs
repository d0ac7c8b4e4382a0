//! 日志核心模块 - 分级过滤与格式化，输出交给轮转引擎或任意 Writer

use std::fmt::{self, Write as _};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use crate::config::{Level, RotationConfig};
use crate::error::{Result, RotateError};
use crate::handler::file::{EngineOptions, RotateOutcome, RotationEngine};
use crate::handler::term::TermOutput;
use crate::handler::{Diagnostics, LogOutput};
use crate::scheduler::{RotationScheduler, SchedulerState};

/// 日志器句柄，可克隆并跨线程共享
///
/// 没有全局实例：调用方显式持有句柄。
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

struct LoggerInner {
    level: AtomicU8,
    prefix: String,
    timestamp: bool,
    output: RwLock<Arc<dyn LogOutput>>,
    engine: Option<Arc<RotationEngine>>,
    scheduler: Mutex<RotationScheduler>,
}

impl LoggerInner {
    fn enabled(&self, level: Level) -> bool {
        level >= Level::from_u8(self.level.load(Ordering::Relaxed))
    }

    fn try_log(&self, level: Level, args: fmt::Arguments<'_>) -> io::Result<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        let line = self.format_line(level, args);
        let output = Arc::clone(&*self.output.read());
        output.write_record(line.as_bytes())
    }

    fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        if let Err(e) = self.try_log(level, args) {
            eprintln!("[rat_rotatelog] 写入日志失败: {}", e);
        }
    }

    fn format_line(&self, level: Level, args: fmt::Arguments<'_>) -> String {
        let mut line = String::with_capacity(self.prefix.len() + 64);
        line.push_str(&self.prefix);
        if self.timestamp {
            let now = chrono::Local::now();
            let _ = write!(line, "{} ", now.format("%Y-%m-%d %H:%M:%S%.3f"));
        }
        line.push_str(level.tag());
        let _ = line.write_fmt(args);
        if !line.ends_with('\n') {
            line.push('\n');
        }
        line
    }
}

/// 把引擎的诊断消息送回日志器本身
struct LoggerDiagnostics(Weak<LoggerInner>);

impl Diagnostics for LoggerDiagnostics {
    fn report(&self, level: Level, message: &str) {
        match self.0.upgrade() {
            Some(inner) => inner.log(level, format_args!("{}", message)),
            None => eprintln!("[rat_rotatelog] {}{}", level.tag(), message),
        }
    }
}

impl Logger {
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn level(&self) -> Level {
        Level::from_u8(self.inner.level.load(Ordering::Relaxed))
    }

    pub fn set_level(&self, level: Level) {
        self.inner.level.store(level as u8, Ordering::Relaxed);
    }

    /// 低于最低级别的记录在格式化之前就被丢弃
    pub fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    /// 替换输出；轮转引擎仍由日志器持有，可通过 [`Logger::engine`] 访问
    pub fn set_output(&self, output: Arc<dyn LogOutput>) {
        *self.inner.output.write() = output;
    }

    pub fn output(&self) -> Arc<dyn LogOutput> {
        Arc::clone(&*self.inner.output.read())
    }

    pub fn log(&self, level: Level, args: fmt::Arguments<'_>) {
        self.inner.log(level, args);
    }

    /// 同 [`Logger::log`]，但返回写入错误
    pub fn try_log(&self, level: Level, args: fmt::Arguments<'_>) -> io::Result<()> {
        self.inner.try_log(level, args)
    }

    pub fn debug(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Debug, args);
    }

    pub fn info(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn notice(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Notice, args);
    }

    pub fn warning(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Warning, args);
    }

    pub fn error(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Error, args);
    }

    pub fn critical(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Critical, args);
    }

    /// 以 Info 级别输出
    pub fn print(&self, args: fmt::Arguments<'_>) {
        self.log(Level::Info, args);
    }

    pub fn flush(&self) {
        if let Err(e) = self.output().flush() {
            eprintln!("[rat_rotatelog] 刷新失败: {}", e);
        }
    }

    pub fn engine(&self) -> Option<&Arc<RotationEngine>> {
        self.inner.engine.as_ref()
    }

    fn require_engine(&self) -> Result<&Arc<RotationEngine>> {
        self.engine()
            .ok_or_else(|| RotateError::Config("logger has no rotation configured".to_string()))
    }

    /// 立即尝试一次轮转
    pub fn rotate(&self) -> Result<RotateOutcome> {
        self.require_engine()?.rotate()
    }

    /// 启动后台轮转；已在运行时重启
    pub fn start_rotate(&self) -> Result<()> {
        let engine = Arc::clone(self.require_engine()?);
        let bucket = engine.config().bucket_duration;
        self.inner.scheduler.lock().start(engine, bucket)
    }

    /// 停止后台轮转，引擎保持可写
    pub fn stop(&self) {
        self.inner.scheduler.lock().stop();
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.lock().state()
    }

    /// 停止调度并释放活动文件
    pub fn shutdown(&self) {
        self.stop();
        if let Some(engine) = self.engine() {
            engine.stop();
        }
    }
}

/// 日志构建器
pub struct LoggerBuilder {
    level: Level,
    prefix: String,
    timestamp: bool,
    output: Option<Arc<dyn LogOutput>>,
    rotation: Option<(PathBuf, RotationConfig)>,
    engine_options: EngineOptions,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            level: Level::Info,
            prefix: String::new(),
            timestamp: false,
            output: None,
            rotation: None,
            engine_options: EngineOptions::default(),
        }
    }

    /// 设置最低日志级别
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// 每行的固定前缀
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// 在级别标签前加本地时间戳
    pub fn with_timestamp(mut self, enabled: bool) -> Self {
        self.timestamp = enabled;
        self
    }

    /// 自定义输出，与 [`LoggerBuilder::with_rotation`] 互斥
    pub fn with_output(mut self, output: Arc<dyn LogOutput>) -> Self {
        self.output = Some(output);
        self
    }

    /// 输出到 stderr
    pub fn add_terminal(self) -> Self {
        self.with_output(Arc::new(TermOutput::stderr()))
    }

    /// 输出到按周期轮转的文件
    pub fn with_rotation(mut self, path: impl Into<PathBuf>, config: RotationConfig) -> Self {
        self.rotation = Some((path.into(), config));
        self
    }

    pub fn with_housekeeping_threads(mut self, threads: usize) -> Self {
        self.engine_options.housekeeping_threads = threads;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.engine_options.compression_level = level;
        self
    }

    /// 构建日志器；轮转配置非法时返回 [`RotateError::Config`]
    pub fn build(self) -> Result<Logger> {
        if self.output.is_some() && self.rotation.is_some() {
            return Err(RotateError::Config(
                "配置冲突: with_output 与 with_rotation 只能选择一个".to_string(),
            ));
        }
        if self.engine_options.housekeeping_threads == 0 {
            return Err(RotateError::Config("housekeeping_threads must be at least 1".to_string()));
        }
        if self.engine_options.compression_level > 9 {
            return Err(RotateError::Config(format!(
                "compression_level {} out of range 0-9",
                self.engine_options.compression_level
            )));
        }

        let engine = match self.rotation {
            Some((path, config)) => Some(Arc::new(RotationEngine::configure_with(
                path,
                config,
                self.engine_options,
            )?)),
            None => None,
        };

        let output: Arc<dyn LogOutput> = match (&engine, self.output) {
            (Some(engine), _) => Arc::clone(engine) as Arc<dyn LogOutput>,
            (None, Some(output)) => output,
            (None, None) => Arc::new(TermOutput::stderr()),
        };

        let inner = Arc::new(LoggerInner {
            level: AtomicU8::new(self.level as u8),
            prefix: self.prefix,
            timestamp: self.timestamp,
            output: RwLock::new(output),
            engine,
            scheduler: Mutex::new(RotationScheduler::new()),
        });

        if let Some(engine) = &inner.engine {
            engine.set_diagnostics(Arc::new(LoggerDiagnostics(Arc::downgrade(&inner))));
        }

        Ok(Logger { inner })
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
