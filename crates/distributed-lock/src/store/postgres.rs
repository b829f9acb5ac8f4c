use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, instrument};

use super::LockStore;
use crate::error::StoreError;

/// PostgreSQL advisory lock 存储
///
/// 每个会话是连接池上的一个事务，锁通过 `pg_try_advisory_xact_lock` 获取，
/// 事务回滚或连接断开时由 PostgreSQL 自动释放，不存在需要清理的残留锁。
///
/// 持有中的锁会一直占用一个连接，因此连接池应与业务连接池分开。
#[derive(Clone)]
pub struct PgLockStore {
    pool: PgPool,
}

impl PgLockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LockStore for PgLockStore {
    type Session = Transaction<'static, Postgres>;

    async fn open_session(&self) -> Result<Self::Session, StoreError> {
        Ok(self.pool.begin().await?)
    }

    #[instrument(skip(self, session))]
    async fn try_acquire(&self, session: &mut Self::Session, key: i64) -> Result<bool, StoreError> {
        let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_xact_lock($1)")
            .bind(key)
            .fetch_one(&mut **session)
            .await?;

        debug!(lock_key = key, acquired, "pg_try_advisory_xact_lock");
        Ok(acquired)
    }

    async fn probe(&self, session: &mut Self::Session) -> Result<(), StoreError> {
        // 没有可查询的锁信息；事务仍然有效即说明锁仍归本会话所有
        let _: bool = sqlx::query_scalar("SELECT TRUE")
            .fetch_one(&mut **session)
            .await?;
        Ok(())
    }

    async fn end_session(&self, session: Self::Session) -> Result<(), StoreError> {
        session.rollback().await?;
        Ok(())
    }
}
