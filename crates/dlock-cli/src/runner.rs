//! 命令执行器

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use dlock::{Lock, LockContext, LockPoller, PgLockFactory, lock_key};
use dlock_shared::config::AppConfig;
use tokio::signal;
use tracing::{info, warn};

pub struct CommandRunner {
    config: AppConfig,
}

impl CommandRunner {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    fn poller(&self) -> LockPoller {
        LockPoller::from_settings(&self.config.lock)
    }

    /// 执行 key 命令
    pub fn run_key(&self, name: &str) {
        let key = lock_key(name);
        println!("{}\t{}\t{:#018x}", name, key, key as u64);
    }

    /// 执行 try 命令，返回是否获取成功
    pub async fn run_try(&self, name: &str) -> Result<bool> {
        let factory = PgLockFactory::connect(&self.config.database).await?;
        let lock = factory.new_lock(name)?;

        match lock.lock(&LockContext::background()).await {
            Ok(()) => {
                lock.release().await?;
                println!("{}: free", name);
                Ok(true)
            }
            Err(err) if err.is_already_held() => {
                println!("{}: held", name);
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 执行 hold 命令
    ///
    /// 获取后在租约监控下持有，收到退出信号或锁丢失时释放。锁丢失以错误返回。
    pub async fn run_hold(&self, name: &str, wait_timeout: Option<u64>) -> Result<()> {
        let factory = PgLockFactory::connect(&self.config.database).await?;
        let poller = self.poller();
        let lock = Arc::new(factory.new_lock(name)?);
        let root = LockContext::background();

        match wait_timeout {
            Some(secs) => {
                info!(resource = name, timeout_secs = secs, "Waiting for lock");
                let ctx = root.with_timeout(Duration::from_secs(secs));
                poller.wait_for_lock(&ctx, lock.as_ref()).await?;
            }
            None => lock.lock(&root).await?,
        }

        let (lease_ctx, guard) = poller.context_lock(&root, lock.clone()).await?;
        info!(
            resource = name,
            lock_key = lock.key(),
            poll_interval_ms = poller.interval().as_millis() as u64,
            "Lock held, press Ctrl+C to release"
        );

        let lost = tokio::select! {
            _ = shutdown_signal() => false,
            _ = lease_ctx.done() => true,
        };

        guard.stop().await;
        lock.release().await?;

        if lost {
            bail!("lock on {} was lost", name);
        }
        info!(resource = name, "Lock released");
        Ok(())
    }
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, releasing lock...");
        }
        _ = terminate => {
            info!("Received SIGTERM, releasing lock...");
        }
    }
}
