//! 过期归档清理

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{Level, RotationConfig};
use crate::error::{Result, RotateError};
use crate::handler::Diagnostics;
use crate::suffix::SuffixClock;

/// 一次清理的结果
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// 已删除
    pub removed: Vec<PathBuf>,
    /// 匹配但未过期
    pub kept: Vec<PathBuf>,
    /// 标签无法解析，或删除失败
    pub skipped: Vec<PathBuf>,
}

/// 按文件名中的时间标签清理过期归档
///
/// 只匹配 `<base>.<定宽数字>`，开启压缩时还匹配 `<base>.<定宽数字>.gz`。
/// 活动文件 `<base>` 本身没有后缀，永远不会被匹配。
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    directory: PathBuf,
    base_name: String,
    clock: SuffixClock,
    compress: bool,
    window: Duration,
}

impl RetentionSweeper {
    pub fn new(base_path: &Path, clock: SuffixClock, compress: bool, window: Duration) -> Result<Self> {
        let base_name = base_path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                RotateError::Config(format!("log path {} has no usable file name", base_path.display()))
            })?
            .to_string();
        let directory = match base_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        Ok(Self {
            directory,
            base_name,
            clock,
            compress,
            window,
        })
    }

    pub fn from_config(base_path: &Path, config: &RotationConfig) -> Result<Self> {
        Self::new(
            base_path,
            SuffixClock::new(config.bucket_duration),
            config.compress,
            config.retention_window(),
        )
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// 文件名匹配归档命名时返回其中的标签
    pub fn match_archive<'a>(&self, file_name: &'a str) -> Option<&'a str> {
        let rest = file_name.strip_prefix(self.base_name.as_str())?.strip_prefix('.')?;
        let label = match rest.strip_suffix(".gz") {
            Some(label) if self.compress => label,
            Some(_) => return None,
            None => rest,
        };
        (label.len() == self.clock.width() && label.bytes().all(|b| b.is_ascii_digit())).then_some(label)
    }

    pub fn sweep(&self, diagnostics: &dyn Diagnostics) -> Result<SweepReport> {
        self.sweep_at(Utc::now(), diagnostics)
    }

    /// 归档年龄为 `now` 减去标签时间，严格超过保留窗口即删除
    pub fn sweep_at(&self, now: DateTime<Utc>, diagnostics: &dyn Diagnostics) -> Result<SweepReport> {
        let entries = fs::read_dir(&self.directory)
            .map_err(|e| RotateError::io(format!("read dir {}", self.directory.display()), e))?;

        let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::MAX);
        let mut report = SweepReport::default();

        for entry in entries.flatten() {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            let Some(label) = self.match_archive(name) else {
                continue;
            };
            let path = entry.path();

            let stamp = match self.clock.parse_label(label) {
                Ok(stamp) => stamp,
                Err(e) => {
                    diagnostics.report(Level::Warning, &format!("skip {}: {}", path.display(), e));
                    report.skipped.push(path);
                    continue;
                }
            };

            if now - stamp <= window {
                report.kept.push(path);
                continue;
            }

            match fs::remove_file(&path) {
                Ok(()) => report.removed.push(path),
                Err(e) => {
                    diagnostics.report(Level::Error, &format!("remove {} failed: {}", path.display(), e));
                    report.skipped.push(path);
                }
            }
        }

        report.removed.sort();
        report.kept.sort();
        report.skipped.sort();
        Ok(report)
    }
}
