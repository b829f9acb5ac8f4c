//! 测试环境管理

use anyhow::Result;
use sqlx::PgPool;
use std::time::Duration;

use dlock::{LockPoller, PgLockFactory, lock_key};
use dlock_shared::test_utils::{
    is_advisory_lock_held, terminate_advisory_holders, test_database_config,
};

/// 模拟一个协作进程：独立连接池上的锁工厂
pub struct TestEnvironment {
    pub factory: PgLockFactory,
    pub poller: LockPoller,
    admin: PgPool,
}

impl TestEnvironment {
    pub async fn setup() -> Result<Self> {
        Self::with_poll_interval(Duration::from_millis(200)).await
    }

    pub async fn with_poll_interval(interval: Duration) -> Result<Self> {
        let config = test_database_config();
        let factory = PgLockFactory::connect(&config).await?;
        let admin = PgPool::connect(&config.url).await?;

        Ok(Self {
            factory,
            poller: LockPoller::new(interval),
            admin,
        })
    }

    /// 终止持有资源锁的所有后端进程，返回终止数量
    pub async fn terminate_holders(&self, name: &str) -> Result<usize> {
        Ok(terminate_advisory_holders(&self.admin, lock_key(name)).await?)
    }

    /// 资源当前是否被任意会话持有
    pub async fn is_held(&self, name: &str) -> Result<bool> {
        Ok(is_advisory_lock_held(&self.admin, lock_key(name)).await?)
    }

    pub async fn cleanup(self) {
        self.admin.close().await;
        self.factory.store().pool().close().await;
    }
}
