//! 存储协作方抽象
//!
//! 锁的正确性完全依赖存储提供的两个能力：
//! 1. 在会话（事务）内对 64 位键做非阻塞的 try-acquire，会话结束即自动释放
//! 2. 在已有会话内执行一次存活探测
//!
//! 连接池、TLS、重试等传输细节都属于具体实现，不在锁的状态机里处理。

mod memory;
mod postgres;

pub use memory::{MemoryLockStore, MemorySession};
pub use postgres::PgLockStore;

use async_trait::async_trait;

use crate::error::StoreError;

/// 锁存储 trait
#[async_trait]
pub trait LockStore: Send + Sync + 'static {
    /// 会话句柄，其存活即代表锁仍被持有
    type Session: Send + 'static;

    /// 打开一个新会话
    async fn open_session(&self) -> Result<Self::Session, StoreError>;

    /// 非阻塞地尝试获取 `key`，返回是否获取成功
    async fn try_acquire(&self, session: &mut Self::Session, key: i64) -> Result<bool, StoreError>;

    /// 探测会话是否仍然存活
    ///
    /// 只说明会话（以及随之绑定的锁）还在，不校验资源本身的任何状态。
    async fn probe(&self, session: &mut Self::Session) -> Result<(), StoreError>;

    /// 结束会话，副作用是释放会话持有的锁
    async fn end_session(&self, session: Self::Session) -> Result<(), StoreError>;
}
