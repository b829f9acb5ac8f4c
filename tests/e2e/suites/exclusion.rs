//! 跨进程互斥测试套件

use dlock::{Lock, LockContext, LockError};
use dlock_shared::test_utils::unique_lock_name;

use crate::setup::TestEnvironment;

#[cfg(test)]
mod exclusion_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_two_processes_end_to_end() {
        let p1 = TestEnvironment::setup().await.unwrap();
        let p2 = TestEnvironment::setup().await.unwrap();
        let ctx = LockContext::background();
        let mylock = unique_lock_name("mylock");
        let differentlock = unique_lock_name("differentlock");

        let a = p1.factory.new_lock(&mylock).unwrap();
        let b = p2.factory.new_lock(&mylock).unwrap();

        a.lock(&ctx).await.unwrap();
        assert!(p2.is_held(&mylock).await.unwrap());
        let err = b.lock(&ctx).await.unwrap_err();
        assert!(matches!(err, LockError::AlreadyHeld { .. }), "{:?}", err);

        a.release().await.unwrap();
        assert!(!p1.is_held(&mylock).await.unwrap());
        b.lock(&ctx).await.unwrap();

        // 另一个资源不受 mylock 影响
        let a2 = p1.factory.new_lock(&differentlock).unwrap();
        let b2 = p2.factory.new_lock(&differentlock).unwrap();
        a2.lock(&ctx).await.unwrap();
        a2.release().await.unwrap();
        b2.lock(&ctx).await.unwrap();
        b2.release().await.unwrap();

        b.release().await.unwrap();
        b.release().await.unwrap();

        p1.cleanup().await;
        p2.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_many_contenders_single_winner() {
        let env = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("contended");
        let ctx = LockContext::background();

        let handles: Vec<_> = (0..4)
            .map(|_| env.factory.new_lock(&name).unwrap())
            .collect();

        let results = futures::future::join_all(handles.iter().map(|h| h.lock(&ctx))).await;
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| e.is_already_held())
        );

        for handle in &handles {
            handle.release().await.unwrap();
        }
        assert!(!env.is_held(&name).await.unwrap());
        env.cleanup().await;
    }

    #[tokio::test]
    #[ignore = "需要数据库连接"]
    async fn test_dropped_handle_frees_resource() {
        let env = TestEnvironment::setup().await.unwrap();
        let name = unique_lock_name("dropped");
        let ctx = LockContext::background();

        {
            let lock = env.factory.new_lock(&name).unwrap();
            lock.lock(&ctx).await.unwrap();
        }

        // 事务随句柄丢弃，连接归还连接池时回滚
        let other = env.factory.new_lock(&name).unwrap();
        env.poller
            .wait_for_lock(&ctx.with_timeout(std::time::Duration::from_secs(5)), &other)
            .await
            .unwrap();
        other.release().await.unwrap();
        env.cleanup().await;
    }
}
