//! 错误类型

use std::io;
use thiserror::Error;

/// 轮转引擎错误
#[derive(Debug, Error)]
pub enum RotateError {
    /// 轮转参数非法，配置阶段同步返回
    #[error("invalid rotate config: {0}")]
    Config(String),

    /// 重命名/打开/读写/删除失败
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    /// 归档文件名匹配，但其中的时间戳无法解析
    #[error("invalid archive label `{label}`: {reason}")]
    Parse { label: String, reason: String },

    /// 引擎已停止
    #[error("rotation engine stopped")]
    Stopped,
}

impl RotateError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        RotateError::Io {
            context: context.into(),
            source,
        }
    }

    pub(crate) fn parse(label: impl Into<String>, reason: impl Into<String>) -> Self {
        RotateError::Parse {
            label: label.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RotateError>;
