// ==========================================
// 계란 로트 매칭 - 草稿 KV 存储
// ==========================================
// 职责: 单一命名空间的 key → JSON 文本存储
// 实现: SQLite（桌面本地） / 内存（测试替身）
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// 草稿存储 trait
///
/// 只处理原始字符串, 序列化由 DraftPersistence 负责。
pub trait DraftStore: Send + Sync {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>>;

    /// 无条件覆盖
    fn put(&self, key: &str, value: &str) -> RepositoryResult<()>;

    /// # 返回
    /// 是否确实删除了记录
    fn remove(&self, key: &str) -> RepositoryResult<bool>;

    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>>;
}

// ==========================================
// SqliteDraftStore
// ==========================================
pub struct SqliteDraftStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDraftStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        let store = Self { conn };
        // best-effort: 建表失败不阻断启动, 使用时再暴露错误
        if let Err(e) = store.ensure_table() {
            tracing::warn!("matching_draft_kv ensure failed: {}", e);
        }
        store
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn ensure_table(&self) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS matching_draft_kv (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL,
              updated_at TEXT NOT NULL DEFAULT (datetime('now', 'localtime'))
            );
            "#,
        )?;
        Ok(())
    }
}

impl DraftStore for SqliteDraftStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM matching_draft_kv WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn put(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO matching_draft_kv (key, value, updated_at)
            VALUES (?1, ?2, datetime('now', 'localtime'))
            ON CONFLICT(key) DO UPDATE SET
              value = excluded.value,
              updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "DELETE FROM matching_draft_kv WHERE key = ?1",
            params![key],
        )?;
        Ok(rows > 0)
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT key FROM matching_draft_kv
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY updated_at DESC, key
            "#,
        )?;
        let keys = stmt
            .query_map(params![prefix], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(keys)
    }
}

// ==========================================
// InMemoryDraftStore - 测试替身
// ==========================================

/// 内存存储, 可模拟 "存储不可用"（例如配额超限）
#[derive(Debug, Default)]
pub struct InMemoryDraftStore {
    entries: Mutex<BTreeMap<String, String>>,
    unavailable: AtomicBool,
}

impl InMemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 打开后所有写操作返回 StorageUnavailable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// 直接写入原始文本（用于构造损坏数据）
    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn entries(&self) -> RepositoryResult<std::sync::MutexGuard<'_, BTreeMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn check_writable(&self) -> RepositoryResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::StorageUnavailable(
                "quota exceeded".to_string(),
            ));
        }
        Ok(())
    }
}

impl DraftStore for InMemoryDraftStore {
    fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        Ok(self.entries()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> RepositoryResult<()> {
        self.check_writable()?;
        self.entries()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RepositoryResult<bool> {
        self.check_writable()?;
        Ok(self.entries()?.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> RepositoryResult<Vec<String>> {
        Ok(self
            .entries()?
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
