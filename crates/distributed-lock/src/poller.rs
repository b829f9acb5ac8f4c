//! 轮询等待获取锁
//!
//! 按固定间隔重复调用 [`Lock::lock`]，直到成功或上下文结束。
//! 多个等待者之间没有排队顺序：资源释放后下一次落到的轮询获胜，
//! 高争用下个别等待者可能一直抢不到。

use dlock_shared::config::LockSettings;
use dlock_shared::observability::metrics::record_wait_timeout;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::context::LockContext;
use crate::error::{LockError, Result};
use crate::lock::Lock;

/// 默认轮询间隔
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// 携带轮询间隔的等待器
///
/// `wait_for_lock` 与租约监控（见 [`crate::lease`]）共用同一个间隔。
#[derive(Debug, Clone, Copy)]
pub struct LockPoller {
    interval: Duration,
}

impl Default for LockPoller {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl LockPoller {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
        }
    }

    pub fn from_settings(settings: &LockSettings) -> Self {
        Self::new(settings.poll_interval())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// 等待直到获取锁或上下文结束
    ///
    /// 第一次尝试立即进行，之后每个间隔重试一次；获取成功立即返回。
    /// 上下文结束时返回 [`LockError::Timeout`]，携带上下文的结束原因。
    pub async fn wait_for_lock<L>(&self, ctx: &LockContext, lock: &L) -> Result<()>
    where
        L: Lock + ?Sized,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                reason = ctx.done() => {
                    debug!(reason = %reason, "Gave up waiting for lock");
                    record_wait_timeout();
                    return Err(LockError::Timeout { reason });
                }

                _ = ticker.tick() => {
                    match lock.lock(ctx).await {
                        Ok(()) => return Ok(()),
                        Err(err) if err.is_already_held() => {
                            debug!("Lock is held elsewhere, retrying");
                        }
                        Err(LockError::Cancelled(_)) => {}
                        Err(err) => {
                            warn!(error = %err, "Lock attempt failed, retrying");
                        }
                    }
                }
            }
        }
    }
}

/// 使用默认间隔等待获取锁
pub async fn wait_for_lock<L>(ctx: &LockContext, lock: &L) -> Result<()>
where
    L: Lock + ?Sized,
{
    LockPoller::default().wait_for_lock(ctx, lock).await
}
