//! 可观测性与配置模块集成测试
//!
//! 从 crate 外部验证公开接口：配置结构、指标记录函数和测试辅助函数。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use dlock_shared::observability::metrics::{
        LOCK_ACQUIRE_TOTAL, record_acquire, record_lease_lost, record_release,
        record_wait_timeout,
    };

    #[test]
    fn test_record_acquire_results() {
        for result in ["acquired", "reentered", "contended", "error"] {
            record_acquire(result);
        }
    }

    #[test]
    fn test_record_lifecycle_counters() {
        record_lease_lost();
        record_release();
        record_wait_timeout();
    }

    #[test]
    fn test_metric_names_are_prefixed() {
        assert!(LOCK_ACQUIRE_TOTAL.starts_with("dlock_"));
    }
}

// ============================================================================
// 配置测试
// ============================================================================

mod config_tests {
    use dlock_shared::config::AppConfig;
    use dlock_shared::observability::ObservabilityConfig;

    #[test]
    fn test_app_config_defaults_are_usable() {
        let config = AppConfig::default();
        assert!(config.database.url.starts_with("postgres://"));
        assert!(config.lock.poll_interval_ms > 0);
    }

    #[test]
    fn test_loaded_observability_follows_service_name() {
        let config = AppConfig::load("dlock-integration").unwrap();
        assert_eq!(config.service_name, "dlock-integration");
        assert_eq!(config.observability.service_name, "dlock-integration");
        assert_ne!(
            config.observability.service_name,
            ObservabilityConfig::default().service_name
        );
    }
}

// ============================================================================
// 测试辅助函数
// ============================================================================

mod test_utils_tests {
    use dlock_shared::test_utils::{test_database_config, unique_lock_name};

    #[test]
    fn test_unique_names_do_not_collide() {
        let names: std::collections::HashSet<_> =
            (0..100).map(|_| unique_lock_name("job")).collect();
        assert_eq!(names.len(), 100);
    }

    #[test]
    fn test_database_config_from_env_or_default() {
        let config = test_database_config();
        assert!(config.url.starts_with("postgres"));
    }
}
