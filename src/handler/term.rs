//! 终端与通用 Writer 输出

use std::any::Any;
use std::io::{self, BufWriter, Write};
use std::sync::Arc;
use parking_lot::Mutex;

use crate::handler::{LogOutput, OutputType};

/// 终端流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// 终端输出，每条记录写完即刷新
pub struct TermOutput {
    stream: Stream,
    stdout: Mutex<BufWriter<io::Stdout>>,
}

impl TermOutput {
    pub fn stdout() -> Self {
        Self::new(Stream::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(Stream::Stderr)
    }

    fn new(stream: Stream) -> Self {
        Self {
            stream,
            stdout: Mutex::new(BufWriter::new(io::stdout())),
        }
    }

    pub fn stream(&self) -> Stream {
        self.stream
    }
}

impl LogOutput for TermOutput {
    fn write_record(&self, data: &[u8]) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => {
                let mut stdout_guard = self.stdout.lock();
                stdout_guard.write_all(data)?;
                stdout_guard.flush()
            }
            // stderr 本身不带缓冲
            Stream::Stderr => io::stderr().lock().write_all(data),
        }
    }

    fn flush(&self) -> io::Result<()> {
        match self.stream {
            Stream::Stdout => self.stdout.lock().flush(),
            Stream::Stderr => io::stderr().flush(),
        }
    }

    fn output_type(&self) -> OutputType {
        OutputType::Terminal
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 任意 `Write` 实现的输出
pub struct WriterOutput<W: Write + Send + 'static> {
    writer: Mutex<W>,
}

impl<W: Write + Send + 'static> WriterOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// 取回内部 writer
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send + 'static> LogOutput for WriterOutput<W> {
    fn write_record(&self, data: &[u8]) -> io::Result<()> {
        self.writer.lock().write_all(data)
    }

    fn flush(&self) -> io::Result<()> {
        self.writer.lock().flush()
    }

    fn output_type(&self) -> OutputType {
        OutputType::Writer
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// 可共享的内存缓冲区
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> Vec<u8> {
        self.inner.lock().clone()
    }

    /// 以 UTF-8 文本读取（非法字节替换）
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock()).into_owned()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
