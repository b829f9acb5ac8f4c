//! 锁键派生
//!
//! 资源名到 advisory lock 键的映射。使用 FNV-1a 64 位哈希：与其他语言的客户端
//! 使用同一算法时，同名资源在所有进程中映射到同一把数据库锁。
//!
//! 哈希冲突意味着两个无关资源共用一把锁，只会降低并发、不会破坏互斥；
//! 在锁名数量较小的场景下可以接受。

use fnv::FnvHasher;
use std::hash::Hasher;

/// 计算资源名对应的锁键
///
/// 直接对 UTF-8 字节做哈希（不经过 `Hash` trait，避免附加的终止字节），
/// 再按位重解释为有符号整数以匹配 PostgreSQL 的 `bigint` 参数。
pub fn lock_key(name: &str) -> i64 {
    let mut hasher = FnvHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish() as i64
}
