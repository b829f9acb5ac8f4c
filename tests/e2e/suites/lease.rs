//! 租约丢失测试套件
//!
//! 通过 pg_terminate_backend 模拟数据库单方面断开持锁连接。

use std::sync::Arc;
use std::time::Duration;

use dlock::{ContextError, Lock, LockContext, LockError};
use dlock_shared::test_utils::unique_lock_name;

use crate::setup::TestEnvironment;

#[cfg(test)]
mod lease_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_context_lock_detects_terminated_backend() {
        let env = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("lease");
        let lock = Arc::new(env.factory.new_lock(&name).unwrap());

        let (lease_ctx, guard) = env
            .poller
            .context_lock(&LockContext::background(), lock.clone())
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!lease_ctx.is_done(), "持锁期间上下文不应结束");

        assert_eq!(env.terminate_holders(&name).await.unwrap(), 1);
        let reason = tokio::time::timeout(Duration::from_secs(2), lease_ctx.done())
            .await
            .expect("租约上下文应在一个轮询间隔内结束");
        assert_eq!(reason, ContextError::Canceled);

        // 已回到未持有状态
        let err = lock.is_lock(&LockContext::background()).await.unwrap_err();
        assert!(matches!(err, LockError::NotHeld { .. }));

        guard.stop().await;
        lock.release().await.unwrap();
        env.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_lost_lock_can_be_taken_by_another_process() {
        let p1 = TestEnvironment::setup().await.unwrap();
        let p2 = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("takeover");

        let lock = p1.factory.new_lock(&name).unwrap();
        lock.lock(&LockContext::background()).await.unwrap();
        assert_eq!(p2.terminate_holders(&name).await.unwrap(), 1);

        // 后端退出是异步的，等待数据库释放
        let other = p2.factory.new_lock(&name).unwrap();
        let ctx = LockContext::background().with_timeout(Duration::from_secs(5));
        p2.poller.wait_for_lock(&ctx, &other).await.unwrap();

        // 原持有者下一次操作才感知丢失，且不会自动重新获取
        let err = lock.lock(&LockContext::background()).await.unwrap_err();
        assert!(matches!(err, LockError::LeaseLost { .. }));
        assert!(lock.lock(&LockContext::background()).await.unwrap_err().is_already_held());

        other.release().await.unwrap();
        lock.release().await.unwrap();
        p1.cleanup().await;
        p2.cleanup().await;
    }
}
