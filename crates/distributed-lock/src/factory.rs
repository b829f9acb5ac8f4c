//! 锁工厂
//!
//! 工厂只持有共享的存储连接，按资源名派生锁键并创建句柄；创建句柄不会获取任何锁。

use dlock_shared::config::DatabaseConfig;
use dlock_shared::database::Database;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::Result;
use crate::key::lock_key;
use crate::lock::{Lock, StoreLock};
use crate::store::{LockStore, PgLockStore};

/// 锁工厂 trait
///
/// 返回的锁在调用 [`Lock::lock`] 之前不持有任何东西。
#[cfg_attr(test, mockall::automock(type Lock = crate::lock::MockLock;))]
pub trait DistributedLock: Send + Sync {
    type Lock: Lock;

    fn new_lock(&self, name: &str) -> Result<Self::Lock>;
}

pub struct LockFactory<S: LockStore> {
    store: Arc<S>,
}

impl<S: LockStore> Clone for LockFactory<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: LockStore> LockFactory<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// 为资源名创建新句柄
    ///
    /// 同一工厂为同一资源名创建的多个句柄彼此独立，通过存储互相争抢。
    pub fn new_lock(&self, name: &str) -> Result<StoreLock<S>> {
        Ok(StoreLock::new(
            name.to_string(),
            lock_key(name),
            self.store.clone(),
        ))
    }
}

impl LockFactory<PgLockStore> {
    /// 连接 PostgreSQL 并创建工厂
    ///
    /// 持有中的锁会占住连接和事务，因此这里总是新建专用连接池，并在返回前做一次
    /// 状态检查，数据库不可达时尽早失败。
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let db = Database::connect(config).await?;
        db.status_check().await?;
        info!("Distributed lock store ready");

        Ok(Self::new(PgLockStore::new(db.pool().clone())))
    }
}

impl<S: LockStore> DistributedLock for LockFactory<S> {
    type Lock = StoreLock<S>;

    fn new_lock(&self, name: &str) -> Result<Self::Lock> {
        LockFactory::new_lock(self, name)
    }
}
