//! 可取消上下文
//!
//! `LockContext` 组合了取消信号（`CancellationToken`）与可选的截止时间，
//! 用于限定单次存储调用、`wait_for_lock` 的轮询，以及租约监控任务的生命周期。
//!
//! - 取消沿父子方向传播：父上下文取消时所有子上下文随之取消，反之不会
//! - 截止时间被子上下文继承，子上下文只能收紧、不能放宽
//! - 上下文结束只是信号，不会释放任何已持有的锁

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// 上下文结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Debug, Clone)]
pub struct LockContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Default for LockContext {
    fn default() -> Self {
        Self::background()
    }
}

impl LockContext {
    /// 根上下文：没有截止时间，只能通过 `cancel` 结束
    pub fn background() -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// 派生可独立取消的子上下文
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// 派生在 `timeout` 后到期的子上下文
    ///
    /// `timeout` 大到无法表示为时间点时视为永不到期，只继承父上下文的截止时间。
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self.child(),
        }
    }

    /// 派生在 `deadline` 到期的子上下文，早于父上下文的截止时间才生效
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent <= deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    /// 取消本上下文及其所有子上下文
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// 上下文已结束时返回原因
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// 等待上下文结束，返回结束原因
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    biased;
                    _ = self.token.cancelled() => ContextError::Canceled,
                    _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
                }
            }
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }

    /// 在上下文限定内执行 `fut`
    ///
    /// 上下文先结束时丢弃 `fut` 并返回结束原因；已经结束的上下文不会轮询 `fut`。
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ContextError>
    where
        F: Future,
    {
        if let Some(reason) = self.err() {
            return Err(reason);
        }
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }
}
