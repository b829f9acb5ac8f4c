//! CLI 命令定义

use clap::{Parser, Subcommand};

/// 分布式锁命令行工具
///
/// 数据库连接等配置从 `config/` 目录和 `DLOCK_` 前缀的环境变量加载。
#[derive(Parser, Debug)]
#[command(name = "dlock")]
#[command(version, about = "基于 PostgreSQL advisory lock 的分布式锁工具")]
#[command(propagate_version = true)]
pub struct Cli {
    /// 日志级别，覆盖配置文件 (trace, debug, info, warn, error)
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// 数据库连接串，覆盖配置文件
    #[arg(long)]
    pub database_url: Option<String>,

    /// 轮询间隔（毫秒），覆盖配置文件
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 尝试获取一次锁，成功后立即释放
    ///
    /// 资源空闲时退出码为 0，被占用时为 1。
    Try {
        /// 资源名
        name: String,
    },

    /// 获取锁并持有，直到收到 Ctrl+C / SIGTERM 或锁丢失
    Hold {
        /// 资源名
        name: String,

        /// 等待获取锁的最长时间（秒），不指定时只尝试一次
        #[arg(short, long)]
        wait_timeout: Option<u64>,
    },

    /// 打印资源名对应的锁键
    Key {
        /// 资源名
        name: String,
    },
}
