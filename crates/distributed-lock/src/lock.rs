//! 锁句柄
//!
//! 句柄只有两个状态：`Unlocked`（没有会话）和 `Locked`（持有存活的会话）。
//! 状态放在句柄私有的异步互斥区里，同一句柄上的 lock / is_lock / release 串行执行；
//! 这个互斥区不跨句柄、更不跨进程，跨进程的互斥完全由存储的 try-acquire 保证。

use async_trait::async_trait;
use dlock_shared::observability::metrics::{record_acquire, record_lease_lost, record_release};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use crate::context::LockContext;
use crate::error::{LockError, Result, StoreOperation};
use crate::store::LockStore;

/// 锁句柄 trait
///
/// 句柄不应在多个并发调用方之间共享来争抢同一资源；需要争抢时每个调用方
/// 从工厂各取一个句柄。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Lock: Send + Sync {
    /// 获取锁
    ///
    /// 已持有时只做存活检查并返回成功，不会重新获取；资源被占用时立即失败，不排队等待。
    async fn lock(&self, ctx: &LockContext) -> Result<()>;

    /// 仅当持有存活会话且探测成功时返回 `Ok`
    ///
    /// 探测失败视为锁丢失：先拆除会话、回到未持有状态，再返回错误。
    async fn is_lock(&self, ctx: &LockContext) -> Result<()>;

    /// 释放锁，未持有时为空操作
    async fn release(&self) -> Result<()>;
}

enum LockState<S> {
    Unlocked,
    Locked(S),
}

/// 基于 [`LockStore`] 的锁句柄
pub struct StoreLock<S: LockStore> {
    name: String,
    key: i64,
    store: Arc<S>,
    state: Mutex<LockState<S::Session>>,
}

impl<S: LockStore> fmt::Debug for StoreLock<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLock")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl<S: LockStore> StoreLock<S> {
    pub(crate) fn new(name: String, key: i64, store: Arc<S>) -> Self {
        Self {
            name,
            key,
            store,
            state: Mutex::new(LockState::Unlocked),
        }
    }

    /// 资源名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 锁键
    pub fn key(&self) -> i64 {
        self.key
    }

    /// 本地状态是否为持有中（不访问存储）
    pub async fn is_locked_locally(&self) -> bool {
        matches!(*self.state.lock().await, LockState::Locked(_))
    }

    /// 打开新会话并尝试获取锁，成功时返回持锁会话
    async fn acquire(&self, ctx: &LockContext) -> Result<S::Session> {
        let mut session = ctx
            .run(self.store.open_session())
            .await?
            .map_err(LockError::store(StoreOperation::OpenSession))?;

        let acquired = match ctx.run(self.store.try_acquire(&mut session, self.key)).await {
            Ok(Ok(acquired)) => acquired,
            Ok(Err(source)) => {
                self.discard(session).await;
                return Err(LockError::Store {
                    operation: StoreOperation::TryAcquire,
                    source,
                });
            }
            Err(reason) => {
                self.discard(session).await;
                return Err(LockError::Cancelled(reason));
            }
        };

        if !acquired {
            self.discard(session).await;
            debug!(
                resource = %self.name,
                lock_key = self.key,
                "Lock not acquired, resource is held by another session"
            );
            record_acquire("contended");
            return Err(LockError::AlreadyHeld {
                resource: self.name.clone(),
            });
        }

        Ok(session)
    }

    /// 在已持有互斥区的前提下检查会话存活
    async fn verify(&self, state: &mut LockState<S::Session>, ctx: &LockContext) -> Result<()> {
        let probe = match state {
            LockState::Locked(session) => ctx.run(self.store.probe(session)).await,
            LockState::Unlocked => {
                return Err(LockError::NotHeld {
                    resource: self.name.clone(),
                });
            }
        };

        match probe {
            Ok(Ok(())) => Ok(()),
            // 上下文结束不代表锁丢失，会话保持不动
            Err(reason) => Err(LockError::Cancelled(reason)),
            Ok(Err(source)) => {
                warn!(
                    resource = %self.name,
                    lock_key = self.key,
                    error = %source,
                    "Lock session probe failed, treating lock as lost"
                );
                record_lease_lost();
                if let LockState::Locked(session) = std::mem::replace(state, LockState::Unlocked) {
                    self.discard(session).await;
                }
                Err(LockError::LeaseLost {
                    resource: self.name.clone(),
                    source,
                })
            }
        }
    }

    /// 尽力结束会话，失败只记录日志
    async fn discard(&self, session: S::Session) {
        if let Err(e) = self.store.end_session(session).await {
            warn!(
                resource = %self.name,
                lock_key = self.key,
                error = %e,
                "Failed to end lock session"
            );
        }
    }
}

#[async_trait]
impl<S: LockStore> Lock for StoreLock<S> {
    #[instrument(skip(self, ctx), fields(resource = %self.name, lock_key = self.key))]
    async fn lock(&self, ctx: &LockContext) -> Result<()> {
        let mut state = self.state.lock().await;

        if matches!(*state, LockState::Locked(_)) {
            let result = self.verify(&mut state, ctx).await;
            if result.is_ok() {
                record_acquire("reentered");
            }
            return result;
        }

        match self.acquire(ctx).await {
            Ok(session) => {
                *state = LockState::Locked(session);
                debug!("Lock acquired");
                record_acquire("acquired");
                Ok(())
            }
            Err(err) => {
                if !err.is_already_held() {
                    record_acquire("error");
                }
                Err(err)
            }
        }
    }

    async fn is_lock(&self, ctx: &LockContext) -> Result<()> {
        let mut state = self.state.lock().await;
        self.verify(&mut state, ctx).await
    }

    #[instrument(skip(self), fields(resource = %self.name, lock_key = self.key))]
    async fn release(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        let LockState::Locked(session) = std::mem::replace(&mut *state, LockState::Unlocked) else {
            return Ok(());
        };

        record_release();
        self.store
            .end_session(session)
            .await
            .map_err(LockError::store(StoreOperation::EndSession))?;

        debug!("Lock released");
        Ok(())
    }
}

impl<S: LockStore> Drop for StoreLock<S> {
    fn drop(&mut self) {
        if matches!(self.state.get_mut(), LockState::Locked(_)) {
            // Drop 中无法执行异步操作；会话随句柄一起被丢弃，锁由存储在会话结束时释放
            warn!(
                resource = %self.name,
                lock_key = self.key,
                "Lock handle dropped while held without explicit release"
            );
        }
    }
}
