//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

use super::ObservabilityConfig;

/// 获取锁的尝试次数，按结果打标签（acquired / reentered / contended / error）
pub const LOCK_ACQUIRE_TOTAL: &str = "dlock_acquire_total";
/// 探测到租约丢失的次数
pub const LOCK_LEASE_LOST_TOTAL: &str = "dlock_lease_lost_total";
/// 显式释放的次数
pub const LOCK_RELEASE_TOTAL: &str = "dlock_release_total";
/// `wait_for_lock` 因上下文结束而放弃的次数
pub const LOCK_WAIT_TIMEOUT_TOTAL: &str = "dlock_wait_timeout_total";

/// Metrics 资源守卫
pub struct MetricsHandle {
    pub addr: SocketAddr,
}

/// 初始化 Prometheus 指标导出
///
/// exporter 自带 HTTP listener，在指定端口暴露抓取端点。
pub fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    register_lock_metrics(&config.service_name);
    info!("Metrics server listening on {}", addr);

    Ok(MetricsHandle { addr })
}

/// 注册锁相关指标的描述
fn register_lock_metrics(service_name: &str) {
    metrics::describe_counter!(LOCK_ACQUIRE_TOTAL, "Total number of lock acquisition attempts");
    metrics::describe_counter!(LOCK_LEASE_LOST_TOTAL, "Total number of detected lease losses");
    metrics::describe_counter!(LOCK_RELEASE_TOTAL, "Total number of explicit lock releases");
    metrics::describe_counter!(
        LOCK_WAIT_TIMEOUT_TOTAL,
        "Total number of wait_for_lock calls that gave up"
    );

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 记录一次获取锁的结果
#[inline]
pub fn record_acquire(result: &'static str) {
    metrics::counter!(LOCK_ACQUIRE_TOTAL, "result" => result).increment(1);
}

/// 记录租约丢失
#[inline]
pub fn record_lease_lost() {
    metrics::counter!(LOCK_LEASE_LOST_TOTAL).increment(1);
}

/// 记录显式释放
#[inline]
pub fn record_release() {
    metrics::counter!(LOCK_RELEASE_TOTAL).increment(1);
}

/// 记录等待超时
#[inline]
pub fn record_wait_timeout() {
    metrics::counter!(LOCK_WAIT_TIMEOUT_TOTAL).increment(1);
}
