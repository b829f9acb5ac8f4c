//! 租约监控
//!
//! 获取锁后派生一个子上下文，并启动后台任务按轮询间隔调用 [`Lock::is_lock`]；
//! 第一次探测失败时取消子上下文。调用方把独占工作限定在子上下文内，就能在锁丢失后
//! 尽快停下来。
//!
//! 取消子上下文不会释放锁，调用方仍需显式调用 [`Lock::release`]。

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::context::LockContext;
use crate::error::{LockError, Result};
use crate::lock::Lock;
use crate::poller::LockPoller;

/// 租约监控任务的句柄
///
/// `cancel` 或 drop 时取消派生上下文并停止后台任务，因此需要在独占工作期间一直持有。
#[derive(Debug)]
#[must_use = "dropping the guard cancels the lease context"]
pub struct LeaseGuard {
    ctx: LockContext,
    task: Option<JoinHandle<()>>,
}

impl LeaseGuard {
    /// 取消派生上下文，后台任务随之退出
    pub fn cancel(&self) {
        self.ctx.cancel();
    }

    /// 取消并等待后台任务退出
    pub async fn stop(mut self) {
        self.ctx.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Lease monitor task failed");
            }
        }
    }

    /// 后台任务是否已经退出
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|task| task.is_finished())
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        self.ctx.cancel();
    }
}

impl LockPoller {
    /// 获取锁并启动租约监控
    ///
    /// 获取失败时直接返回错误，不启动任何任务。成功时返回派生上下文和监控句柄：
    /// 锁被探测到丢失、`ctx` 结束或句柄被取消时，派生上下文结束。
    pub async fn context_lock<L>(
        &self,
        ctx: &LockContext,
        lock: Arc<L>,
    ) -> Result<(LockContext, LeaseGuard)>
    where
        L: Lock + ?Sized + 'static,
    {
        lock.lock(ctx).await?;

        let lease_ctx = ctx.child();
        let task = tokio::spawn(monitor(lease_ctx.clone(), lock, self.interval()));

        Ok((
            lease_ctx.clone(),
            LeaseGuard {
                ctx: lease_ctx,
                task: Some(task),
            },
        ))
    }
}

async fn monitor<L>(ctx: LockContext, lock: Arc<L>, period: std::time::Duration)
where
    L: Lock + ?Sized,
{
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = ctx.done() => {
                debug!("Lease monitor stopped");
                return;
            }

            _ = ticker.tick() => {
                match lock.is_lock(&ctx).await {
                    Ok(()) => {}
                    Err(LockError::Cancelled(_)) => return,
                    Err(err) => {
                        if ctx.is_done() {
                            return;
                        }
                        warn!(error = %err, "Lock lease lost, cancelling context");
                        ctx.cancel();
                        return;
                    }
                }
            }
        }
    }
}

/// 使用默认间隔获取锁并启动租约监控
pub async fn context_lock<L>(ctx: &LockContext, lock: Arc<L>) -> Result<(LockContext, LeaseGuard)>
where
    L: Lock + ?Sized + 'static,
{
    LockPoller::default().context_lock(ctx, lock).await
}
