//! 分布式锁
//!
//! 基于 PostgreSQL 事务级 advisory lock 的命名互斥锁：同一资源名在任意多个协作进程之间
//! 同一时刻最多只有一个持有者。
//!
//! ## 核心概念
//!
//! - **锁键**：资源名经 FNV-1a 64 位哈希得到的 `i64`，见 [`key::lock_key`]
//! - **会话**：一个打开的数据库事务，是持有锁的唯一凭证；事务结束（显式释放、
//!   探测失败、连接断开）时数据库自动释放 advisory lock
//! - **句柄**：[`StoreLock`]，在本地用互斥区串行化同一句柄上的 lock/is_lock/release
//!
//! ## 模块结构
//!
//! - `key`: 锁键派生
//! - `error`: 错误类型定义
//! - `context`: 可取消、可设截止时间的上下文
//! - `store`: 存储协作方抽象及 PostgreSQL / 内存实现
//! - `lock`: 锁句柄状态机
//! - `factory`: 锁工厂
//! - `poller`: 轮询等待获取锁
//! - `lease`: 租约监控，锁丢失时取消派生上下文
//!
//! ## 使用示例
//!
//! ```ignore
//! let factory = LockFactory::connect(&config.database).await?;
//! let lock = Arc::new(factory.new_lock("nightly-report")?);
//!
//! let ctx = LockContext::background().with_timeout(Duration::from_secs(30));
//! wait_for_lock(&ctx, lock.as_ref()).await?;
//!
//! let (lease_ctx, guard) = context_lock(&LockContext::background(), lock.clone()).await?;
//! lease_ctx.run(do_exclusive_work()).await?;
//!
//! guard.cancel();
//! lock.release().await?;
//! ```

pub mod context;
pub mod error;
pub mod factory;
pub mod key;
pub mod lease;
pub mod lock;
pub mod poller;
pub mod store;

pub use context::{ContextError, LockContext};
pub use error::{LockError, Result, StoreError, StoreOperation};
pub use factory::{DistributedLock, LockFactory};
pub use key::lock_key;
pub use lease::{LeaseGuard, context_lock};
pub use lock::{Lock, StoreLock};
pub use poller::{DEFAULT_POLL_INTERVAL, LockPoller, wait_for_lock};
pub use store::{LockStore, MemoryLockStore, PgLockStore};

/// PostgreSQL 后端的锁工厂
pub type PgLockFactory = LockFactory<PgLockStore>;

/// PostgreSQL 后端的锁句柄
pub type PgLock = StoreLock<PgLockStore>;
