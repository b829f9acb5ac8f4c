//! 等待获取测试套件

use std::sync::Arc;
use std::time::{Duration, Instant};

use dlock::{ContextError, Lock, LockContext, LockError};
use dlock_shared::test_utils::unique_lock_name;

use crate::setup::TestEnvironment;

#[cfg(test)]
mod waiting_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_wait_times_out_on_permanently_held_lock() {
        let p1 = TestEnvironment::setup().await.unwrap();
        let p2 = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("held");

        let holder = p1.factory.new_lock(&name).unwrap();
        holder.lock(&LockContext::background()).await.unwrap();

        let waiter = p2.factory.new_lock(&name).unwrap();
        let ctx = LockContext::background().with_timeout(Duration::from_secs(1));
        let start = Instant::now();
        let err = p2.poller.wait_for_lock(&ctx, &waiter).await.unwrap_err();

        assert!(matches!(
            err,
            LockError::Timeout {
                reason: ContextError::DeadlineExceeded
            }
        ));
        assert!(start.elapsed() >= Duration::from_millis(900));
        assert!(start.elapsed() < Duration::from_secs(3));

        holder.release().await.unwrap();
        p1.cleanup().await;
        p2.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_wait_acquires_once_released() {
        let p1 = TestEnvironment::setup().await.unwrap();
        let p2 = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("handoff");

        let holder = Arc::new(p1.factory.new_lock(&name).unwrap());
        holder.lock(&LockContext::background()).await.unwrap();

        let releaser = holder.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(700)).await;
            releaser.release().await.unwrap();
        });

        let waiter = p2.factory.new_lock(&name).unwrap();
        let ctx = LockContext::background().with_timeout(Duration::from_secs(10));
        p2.poller.wait_for_lock(&ctx, &waiter).await.unwrap();
        waiter.is_lock(&ctx).await.unwrap();

        waiter.release().await.unwrap();
        p1.cleanup().await;
        p2.cleanup().await;
    }
}
