//! 数据库连接管理模块
//!
//! 提供锁专用的 PostgreSQL 连接池，支持状态检查和连接配置。

use crate::config::DatabaseConfig;
use crate::error::{InfraError, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 创建数据库连接池
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(config.max_lifetime_seconds))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database connection pool created"
        );

        Ok(Self { pool })
    }

    /// 获取连接池引用
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 状态检查
    ///
    /// 执行一次真实的往返查询，而不是只看连接池里是否还有连接：
    /// 之前能连通、随后数据库消失的情况下 ping 可能误报成功。
    pub async fn status_check(&self) -> Result<()> {
        let ok: bool = sqlx::query_scalar("SELECT true")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| InfraError::StatusCheck(e.to_string()))?;

        if ok {
            Ok(())
        } else {
            Err(InfraError::StatusCheck("unexpected status result".to_string()))
        }
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

impl std::ops::Deref for Database {
    type Target = PgPool;

    fn deref(&self) -> &Self::Target {
        &self.pool
    }
}
