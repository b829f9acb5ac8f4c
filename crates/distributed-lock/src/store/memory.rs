use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::LockStore;
use crate::error::StoreError;

/// 进程内的锁存储
///
/// 语义与 PostgreSQL 事务级 advisory lock 保持一致：锁绑定在会话上，会话结束
/// （显式结束、被强制终止、或会话对象被 drop）时自动释放；同一会话重复获取同一个键
/// 视为成功。
///
/// 用于测试和单进程部署，并提供故障注入：
/// - [`kill_sessions_holding`](Self::kill_sessions_holding) 模拟数据库单方面断开持锁连接
/// - [`fail_next_open`](Self::fail_next_open) 模拟下一次打开会话失败
/// - [`fail_next_try_acquire`](Self::fail_next_try_acquire) 模拟下一次获取时连接出错
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    next_session_id: u64,
    live_sessions: HashSet<u64>,
    /// lock key -> 持有者会话 ID
    holders: HashMap<i64, u64>,
    fail_next_open: Option<String>,
    fail_next_try_acquire: Option<String>,
    open_calls: usize,
    try_acquire_calls: usize,
    probe_calls: usize,
}

impl Inner {
    fn release_session(&mut self, session_id: u64) {
        self.live_sessions.remove(&session_id);
        self.holders.retain(|_, holder| *holder != session_id);
    }
}

/// 内存存储的会话
pub struct MemorySession {
    id: u64,
    inner: Arc<Mutex<Inner>>,
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.inner.lock().release_session(self.id);
    }
}

impl MemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前持有 `key` 的会话是否存在
    pub fn is_held(&self, key: i64) -> bool {
        self.inner.lock().holders.contains_key(&key)
    }

    /// 强制终止持有 `key` 的会话，返回被终止的会话数
    ///
    /// 锁立即被释放；会话对象仍在持有方手里，但之后的探测都会失败。
    pub fn kill_sessions_holding(&self, key: i64) -> usize {
        let mut inner = self.inner.lock();
        let Some(session_id) = inner.holders.get(&key).copied() else {
            return 0;
        };
        inner.release_session(session_id);
        1
    }

    /// 让下一次 `open_session` 返回存储不可用错误
    pub fn fail_next_open(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_open = Some(message.into());
    }

    /// 让下一次 `try_acquire` 返回存储不可用错误，会话本身保持存活
    pub fn fail_next_try_acquire(&self, message: impl Into<String>) {
        self.inner.lock().fail_next_try_acquire = Some(message.into());
    }

    pub fn live_sessions(&self) -> usize {
        self.inner.lock().live_sessions.len()
    }

    pub fn open_calls(&self) -> usize {
        self.inner.lock().open_calls
    }

    pub fn try_acquire_calls(&self) -> usize {
        self.inner.lock().try_acquire_calls
    }

    pub fn probe_calls(&self) -> usize {
        self.inner.lock().probe_calls
    }
}

fn session_closed(id: u64) -> StoreError {
    StoreError::SessionClosed(format!("session {} terminated", id))
}

#[async_trait]
impl LockStore for MemoryLockStore {
    type Session = MemorySession;

    async fn open_session(&self) -> Result<Self::Session, StoreError> {
        let mut inner = self.inner.lock();
        inner.open_calls += 1;
        if let Some(message) = inner.fail_next_open.take() {
            return Err(StoreError::Unavailable(message));
        }

        inner.next_session_id += 1;
        let id = inner.next_session_id;
        inner.live_sessions.insert(id);

        Ok(MemorySession {
            id,
            inner: self.inner.clone(),
        })
    }

    async fn try_acquire(&self, session: &mut Self::Session, key: i64) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock();
        inner.try_acquire_calls += 1;
        if !inner.live_sessions.contains(&session.id) {
            return Err(session_closed(session.id));
        }
        if let Some(message) = inner.fail_next_try_acquire.take() {
            return Err(StoreError::Unavailable(message));
        }

        let holder = *inner.holders.entry(key).or_insert(session.id);
        Ok(holder == session.id)
    }

    async fn probe(&self, session: &mut Self::Session) -> Result<(), StoreError> {
        let mut inner = self.inner.lock();
        inner.probe_calls += 1;
        if inner.live_sessions.contains(&session.id) {
            Ok(())
        } else {
            Err(session_closed(session.id))
        }
    }

    async fn end_session(&self, session: Self::Session) -> Result<(), StoreError> {
        let was_live = self.inner.lock().live_sessions.contains(&session.id);
        let id = session.id;
        // drop 时释放锁
        drop(session);

        if was_live {
            Ok(())
        } else {
            Err(session_closed(id))
        }
    }
}
