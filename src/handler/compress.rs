//! 归档压缩

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use flate2::Compression;
use flate2::write::GzEncoder;
use threadpool::ThreadPool;

use crate::config::Level;
use crate::error::{Result, RotateError};
use crate::handler::Diagnostics;

/// 压缩结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressOutcome {
    /// 已压缩，附带 `.gz` 路径
    Compressed(PathBuf),
    /// 已有任务在执行，本次跳过且不会重试
    Skipped,
}

/// 单飞行压缩器：同一时刻最多一个压缩任务
#[derive(Clone)]
pub struct CompressionWorker {
    in_flight: Arc<AtomicBool>,
    level: Compression,
}

impl CompressionWorker {
    pub fn new() -> Self {
        Self::with_level(Compression::default().level())
    }

    /// 指定 gzip 压缩级别（0-9）
    pub fn with_level(level: u32) -> Self {
        Self {
            in_flight: Arc::new(AtomicBool::new(false)),
            level: Compression::new(level.min(9)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// 在当前线程压缩 `path`
    pub fn compress(&self, path: &Path) -> Result<CompressOutcome> {
        let Some(_slot) = InFlight::acquire(&self.in_flight) else {
            return Ok(CompressOutcome::Skipped);
        };
        compress_file(path, self.level).map(CompressOutcome::Compressed)
    }

    /// 将压缩任务投递到线程池；已有任务在执行时返回 false
    pub fn spawn(&self, pool: &ThreadPool, path: PathBuf, diagnostics: Arc<dyn Diagnostics>) -> bool {
        let Some(slot) = InFlight::acquire(&self.in_flight) else {
            return false;
        };
        let level = self.level;
        pool.execute(move || {
            let _slot = slot;
            if let Err(e) = compress_file(&path, level) {
                diagnostics.report(Level::Error, &format!("compress {} failed: {}", path.display(), e));
            }
        });
        true
    }
}

impl Default for CompressionWorker {
    fn default() -> Self {
        Self::new()
    }
}

/// 占用标记，释放时清除
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<InFlight> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(Arc::clone(flag)))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// `<path>.gz`
pub fn gz_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

/// 压缩成功后才删除原文件；失败时删除半成品 `.gz`，原文件保持不动
fn compress_file(path: &Path, level: Compression) -> Result<PathBuf> {
    let input = File::open(path)
        .map_err(|e| RotateError::io(format!("open {} for compress", path.display()), e))?;

    let gz_path = gz_path_for(path);
    // 已有的 `.gz` 不可覆盖，create_new 在存在时返回 AlreadyExists
    let output = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&gz_path)
        .map_err(|e| RotateError::io(format!("open gz file {}", gz_path.display()), e))?;

    if let Err(e) = write_gzip(input, output, level) {
        let _ = fs::remove_file(&gz_path);
        return Err(RotateError::io(format!("write gz file {}", gz_path.display()), e));
    }

    fs::remove_file(path).map_err(|e| RotateError::io(format!("remove {}", path.display()), e))?;
    Ok(gz_path)
}

fn write_gzip(input: File, output: File, level: Compression) -> io::Result<()> {
    let mut encoder = GzEncoder::new(BufWriter::new(output), level);
    io::copy(&mut BufReader::new(input), &mut encoder)?;
    let file = encoder.finish()?.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()
}
