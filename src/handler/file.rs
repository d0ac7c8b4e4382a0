//! 文件日志输出 - 按时间周期轮转的活动文件

use std::any::Any;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use threadpool::ThreadPool;

use crate::config::{Level, RotationConfig};
use crate::error::{Result, RotateError};
use crate::handler::compress::{CompressionWorker, gz_path_for};
use crate::handler::retention::RetentionSweeper;
use crate::handler::{Diagnostics, LogOutput, OutputType, StderrDiagnostics};
use crate::suffix::SuffixClock;

/// 引擎的附加选项
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// 压缩与清理任务的线程数
    pub housekeeping_threads: usize,
    /// gzip 压缩级别（0-9）
    pub compression_level: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            housekeeping_threads: 2,
            compression_level: 6,
        }
    }
}

/// 一次轮转的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    /// 仍在同一周期内，没有任何 I/O
    Unchanged,
    /// 活动文件已归档
    Rotated { archive: PathBuf },
}

/// 活动文件句柄；停止后为 None
type ActiveHandle = Mutex<Option<File>>;

/// 轮转引擎
///
/// 写入者通过 `ArcSwap` 读取当前句柄，只会看到交换前或交换后的文件。
/// 交换后轮转会在旧句柄的锁内取走文件，已在锁内的写入先落入归档；
/// 之后才拿到锁的写入者发现句柄为空，重新读取新句柄再写。
/// 归档在关闭旧句柄之后才交给压缩任务。
/// 轮转由 `suffix` 互斥锁串行化，存储的标签即上次成功轮转（或配置时）所在的周期。
pub struct RotationEngine {
    path: PathBuf,
    config: RotationConfig,
    clock: SuffixClock,
    active: ArcSwap<ActiveHandle>,
    suffix: Mutex<String>,
    stopped: AtomicBool,
    compressor: CompressionWorker,
    sweeper: Arc<RetentionSweeper>,
    pool: Mutex<ThreadPool>,
    diagnostics: RwLock<Arc<dyn Diagnostics>>,
    #[cfg(test)]
    fail_next_open: AtomicBool,
}

impl RotationEngine {
    /// 打开（或创建）`path` 并以当前时间所在周期作为初始标签
    pub fn configure(path: impl AsRef<Path>, config: RotationConfig) -> Result<Self> {
        Self::configure_with(path, config, EngineOptions::default())
    }

    pub fn configure_with(path: impl AsRef<Path>, config: RotationConfig, options: EngineOptions) -> Result<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();
        let sweeper = RetentionSweeper::from_config(&path, &config)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| RotateError::io(format!("create log dir {}", parent.display()), e))?;
        }
        let file = open_append(&path).map_err(|e| RotateError::io(format!("open {}", path.display()), e))?;

        let clock = SuffixClock::new(config.bucket_duration);
        let suffix = clock.label_now();
        let pool = ThreadPool::with_name(
            "rat_rotatelog-housekeeping".to_string(),
            options.housekeeping_threads.max(1),
        );

        Ok(Self {
            path,
            clock,
            active: ArcSwap::from_pointee(Mutex::new(Some(file))),
            suffix: Mutex::new(suffix),
            stopped: AtomicBool::new(false),
            compressor: CompressionWorker::with_level(options.compression_level),
            sweeper: Arc::new(sweeper),
            pool: Mutex::new(pool),
            diagnostics: RwLock::new(Arc::new(StderrDiagnostics)),
            config,
            #[cfg(test)]
            fail_next_open: AtomicBool::new(false),
        })
    }

    /// 替换诊断通道
    pub fn set_diagnostics(&self, diagnostics: Arc<dyn Diagnostics>) {
        *self.diagnostics.write() = diagnostics;
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &RotationConfig {
        &self.config
    }

    pub fn clock(&self) -> &SuffixClock {
        &self.clock
    }

    pub fn sweeper(&self) -> &RetentionSweeper {
        &self.sweeper
    }

    pub fn current_suffix(&self) -> String {
        self.suffix.lock().clone()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 写入活动文件，从不触发轮转
    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        self.write_via(self.active.load_full(), data)
    }

    /// 经由已取得的句柄写入；句柄已被轮转关闭时改用当前句柄
    fn write_via(&self, mut active: Arc<ActiveHandle>, data: &[u8]) -> io::Result<()> {
        loop {
            if let Some(file) = active.lock().as_mut() {
                return file.write_all(data);
            }
            if self.is_stopped() {
                return Err(io::Error::other("rotation engine stopped"));
            }
            active = self.active.load_full();
        }
    }

    pub fn rotate(&self) -> Result<RotateOutcome> {
        self.rotate_at(Utc::now())
    }

    /// 以 `now` 所在周期执行一次轮转
    ///
    /// 标签不大于已存储标签时直接返回 [`RotateOutcome::Unchanged`]，
    /// 所以同一周期内的重复调用（定时器与手动触发重叠）只会重命名一次。
    pub fn rotate_at(&self, now: DateTime<Utc>) -> Result<RotateOutcome> {
        let mut suffix = self.suffix.lock();
        if self.is_stopped() {
            return Err(RotateError::Stopped);
        }

        let label = self.clock.label_at(now);
        // 时钟回拨时标签可能变小，同样不轮转
        if label.as_str() <= suffix.as_str() {
            return Ok(RotateOutcome::Unchanged);
        }

        let archive = archive_path(&self.path, &label);
        let occupied = self.config.compress && gz_path_for(&archive).exists();
        let linked = if occupied {
            Err(io::Error::new(io::ErrorKind::AlreadyExists, "compressed archive exists"))
        } else {
            link_archive(&self.path, &archive)
        };
        match linked {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let err = RotateError::io(
                    format!("rotate {}", self.path.display()),
                    io::Error::new(io::ErrorKind::AlreadyExists, format!("archive {} already exists", archive.display())),
                );
                self.report(Level::Error, &err.to_string());
                // 归档不可覆盖：继续写当前文件，下个周期以新标签归档
                *suffix = label;
                return Err(err);
            }
            Err(e) => {
                let err = RotateError::io(format!("rename {} -> {}", self.path.display(), archive.display()), e);
                self.report(Level::Error, &err.to_string());
                return Err(err);
            }
        }

        let fresh = match self.open_active() {
            Ok(file) => file,
            Err(e) => {
                let err = RotateError::io(format!("open {}", self.path.display()), e);
                self.report(Level::Error, &err.to_string());
                if let Err(restore) = fs::rename(&archive, &self.path) {
                    self.report(
                        Level::Error,
                        &format!("restore {} -> {} failed: {}", archive.display(), self.path.display(), restore),
                    );
                }
                return Err(err);
            }
        };

        let previous = self.active.swap(Arc::new(Mutex::new(Some(fresh))));
        // 等待锁内的写入者，然后关闭旧句柄
        let old = previous.lock().take();
        if let Some(mut file) = old {
            if let Err(e) = file.flush() {
                self.report(Level::Error, &format!("flush {} failed: {}", archive.display(), e));
            }
        }
        *suffix = label;

        self.schedule_housekeeping(archive.clone());
        Ok(RotateOutcome::Rotated { archive })
    }

    /// 释放活动句柄；可重复调用
    pub fn stop(&self) {
        let _suffix = self.suffix.lock();
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        let active = self.active.load();
        let handle = active.lock().take();
        if let Some(mut file) = handle {
            if let Err(e) = file.flush() {
                self.report(Level::Error, &format!("flush {} on stop failed: {}", self.path.display(), e));
            }
        }
    }

    /// 等待已投递的压缩与清理任务完成
    pub fn wait_housekeeping(&self) {
        let pool = self.pool.lock().clone();
        pool.join();
    }

    fn schedule_housekeeping(&self, archive: PathBuf) {
        let diagnostics = Arc::clone(&*self.diagnostics.read());
        let pool = self.pool.lock();

        if self.config.compress {
            // 已有压缩在执行时静默跳过
            self.compressor.spawn(&pool, archive, Arc::clone(&diagnostics));
        }

        let sweeper = Arc::clone(&self.sweeper);
        pool.execute(move || {
            if let Err(e) = sweeper.sweep(diagnostics.as_ref()) {
                diagnostics.report(Level::Error, &format!("retention sweep failed: {}", e));
            }
        });
    }

    fn open_active(&self) -> io::Result<File> {
        if self.open_should_fail() {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "injected open failure"));
        }
        open_append(&self.path)
    }

    #[cfg(test)]
    fn open_should_fail(&self) -> bool {
        self.fail_next_open.swap(false, Ordering::AcqRel)
    }

    #[cfg(not(test))]
    fn open_should_fail(&self) -> bool {
        false
    }

    fn report(&self, level: Level, message: &str) {
        let diagnostics = Arc::clone(&*self.diagnostics.read());
        diagnostics.report(level, message);
    }
}

impl LogOutput for RotationEngine {
    fn write_record(&self, data: &[u8]) -> io::Result<()> {
        self.write(data)
    }

    fn flush(&self) -> io::Result<()> {
        let active = self.active.load();
        let mut handle = active.lock();
        match handle.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }

    fn output_type(&self) -> OutputType {
        OutputType::File
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `<path>.<label>`
pub fn archive_path(path: &Path, label: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(label);
    PathBuf::from(name)
}

/// 不覆盖已有文件的重命名：先硬链接，再删除原名
fn link_archive(path: &Path, archive: &Path) -> io::Result<()> {
    fs::hard_link(path, archive)?;
    if let Err(e) = fs::remove_file(path) {
        let _ = fs::remove_file(archive);
        return Err(e);
    }
    Ok(())
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
