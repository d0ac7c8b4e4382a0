//! 轮转调度器 - 后台线程按周期边界驱动轮转
//!
//! 状态机：`Idle → Running → Stopped`。运行中再次 `start` 会先停掉旧循环再启动新循环。

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::Utc;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};

use crate::error::{Result, RotateError};
use crate::handler::file::RotationEngine;
use crate::suffix::SuffixClock;

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// 调度命令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    /// 立即尝试轮转
    RotateNow,
    /// 退出循环，不再轮转
    Stop,
}

/// 轮转调度器
pub struct RotationScheduler {
    state: SchedulerState,
    sender: Option<Sender<SchedulerCommand>>,
    worker_thread: Option<thread::JoinHandle<()>>,
}

impl RotationScheduler {
    pub fn new() -> Self {
        Self {
            state: SchedulerState::Idle,
            sender: None,
            worker_thread: None,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    /// 启动调度循环；已在运行时重启
    pub fn start(&mut self, engine: Arc<RotationEngine>, bucket: Duration) -> Result<()> {
        if bucket.is_zero() {
            return Err(RotateError::Config("scheduler bucket must be positive".to_string()));
        }
        if self.is_running() {
            self.stop();
        }

        let (sender, receiver) = unbounded();
        let clock = SuffixClock::new(bucket);
        let worker_thread = thread::Builder::new()
            .name("rat_rotatelog-scheduler".to_string())
            .spawn(move || Self::worker_thread(engine, receiver, clock))
            .map_err(|e| RotateError::io("spawn scheduler thread", e))?;

        self.sender = Some(sender);
        self.worker_thread = Some(worker_thread);
        self.state = SchedulerState::Running;
        Ok(())
    }

    /// 请求一次带外轮转
    pub fn rotate_now(&self) -> Result<()> {
        match &self.sender {
            Some(sender) if self.is_running() => sender
                .send(SchedulerCommand::RotateNow)
                .map_err(|_| RotateError::Stopped),
            _ => Err(RotateError::Stopped),
        }
    }

    /// 停止调度；返回时循环已退出，正在进行的轮转允许跑完
    pub fn stop(&mut self) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.send(SchedulerCommand::Stop);
        }
        if let Some(handle) = self.worker_thread.take() {
            // 从调度线程内部调用时不能 join 自己
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
        if self.state == SchedulerState::Running {
            self.state = SchedulerState::Stopped;
        }
    }

    fn worker_thread(engine: Arc<RotationEngine>, receiver: Receiver<SchedulerCommand>, clock: SuffixClock) {
        loop {
            let now = Utc::now();
            let wait = (clock.next_boundary_after(now) - now).to_std().unwrap_or(Duration::ZERO);

            match receiver.recv_timeout(wait) {
                Ok(SchedulerCommand::RotateNow) | Err(RecvTimeoutError::Timeout) => {}
                Ok(SchedulerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break,
            }

            // 其余失败已由引擎上报
            if let Err(RotateError::Stopped) = engine.rotate() {
                break;
            }
        }
    }
}

impl Default for RotationScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RotationScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
