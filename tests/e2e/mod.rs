//! 分布式锁端到端测试
//!
//! 每个 `TestEnvironment` 持有独立的连接池，多个环境模拟多个协作进程：
//! - 跨进程互斥与释放
//! - 等待获取与超时
//! - 持锁连接被数据库终止后的租约丢失
//!
//! 需要可访问的 PostgreSQL（`TESTINGDB_URL`），运行方式：
//!
//! ```bash
//! cargo test --test e2e -- --ignored
//! ```

pub mod setup;
pub mod suites;

pub use setup::TestEnvironment;
