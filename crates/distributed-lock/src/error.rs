//! 分布式锁错误类型
//!
//! 区分三类失败：资源争用（调用方的常规分支，应重试或退避）、存储层故障
//! （带上失败的操作名以便定位）、以及调用方上下文结束。

use dlock_shared::error::InfraError;
use std::fmt;
use thiserror::Error;

use crate::context::ContextError;

/// 存储协作方上的操作，用于标注存储错误发生的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    OpenSession,
    TryAcquire,
    EndSession,
}

impl StoreOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenSession => "open_session",
            Self::TryAcquire => "try_acquire",
            Self::EndSession => "end_session",
        }
    }
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 存储层错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("会话已失效: {0}")]
    SessionClosed(String),

    #[error("存储不可用: {0}")]
    Unavailable(String),
}

/// 分布式锁错误类型
#[derive(Debug, Error)]
pub enum LockError {
    /// 资源已被其他会话持有
    #[error("获取锁失败: 资源已被占用 resource={resource}")]
    AlreadyHeld { resource: String },

    /// 句柄上没有存活的会话
    #[error("获取锁失败: 未持有资源 resource={resource}")]
    NotHeld { resource: String },

    /// 持有中的会话探测失败，锁已视为丢失
    #[error("获取锁失败: 租约已丢失 resource={resource}: {source}")]
    LeaseLost {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("存储操作失败 ({operation}): {source}")]
    Store {
        operation: StoreOperation,
        #[source]
        source: StoreError,
    },

    /// 等待获取锁时上下文结束
    #[error("等待获取锁超时: {reason}")]
    Timeout {
        #[source]
        reason: ContextError,
    },

    /// 单次存储调用因上下文结束被中止
    #[error("操作已中止: {0}")]
    Cancelled(#[from] ContextError),

    #[error(transparent)]
    Infra(#[from] InfraError),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, LockError>;

impl LockError {
    pub(crate) fn store(operation: StoreOperation) -> impl FnOnce(StoreError) -> Self {
        move |source| Self::Store { operation, source }
    }

    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyHeld { .. } => "LOCK_ALREADY_HELD",
            Self::NotHeld { .. } => "LOCK_NOT_HELD",
            Self::LeaseLost { .. } => "LOCK_LEASE_LOST",
            Self::Store { .. } => "LOCK_STORE_ERROR",
            Self::Timeout { .. } => "LOCK_WAIT_TIMEOUT",
            Self::Cancelled(_) => "LOCK_CANCELLED",
            Self::Infra(e) => e.code(),
        }
    }

    /// 是否表示"当前没有持有锁"
    ///
    /// 资源被占用、句柄未持有、租约丢失都属于这一类，调用方通常以相同方式处理。
    pub fn is_already_held(&self) -> bool {
        matches!(
            self,
            Self::AlreadyHeld { .. } | Self::NotHeld { .. } | Self::LeaseLost { .. }
        )
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AlreadyHeld { .. } | Self::LeaseLost { .. } | Self::Store { .. } => true,
            Self::Infra(e) => e.is_retryable(),
            Self::NotHeld { .. } | Self::Timeout { .. } | Self::Cancelled(_) => false,
        }
    }
}
