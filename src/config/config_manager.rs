// ==========================================
// 계란 로트 매칭 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::{configure_sqlite_connection, ensure_schema, open_sqlite_connection};
use crate::repository::draft_persistence::DEFAULT_DRAFT_KEY_PREFIX;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 默认后端地址
pub const DEFAULT_BACKEND_BASE_URL: &str = "http://localhost:8080/api";
/// 默认 HTTP 超时（毫秒）, 对所有请求统一生效
pub const DEFAULT_BACKEND_TIMEOUT_MS: u64 = 10_000;
/// 默认语言
pub const DEFAULT_LOCALE: &str = "ko-KR";

/// 已解析的运行配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingSettings {
    pub backend_base_url: String,
    pub backend_timeout_ms: u64,
    pub backend_auth_token: Option<String>,
    pub draft_key_prefix: String,
    pub locale: String,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            backend_base_url: DEFAULT_BACKEND_BASE_URL.to_string(),
            backend_timeout_ms: DEFAULT_BACKEND_TIMEOUT_MS,
            backend_auth_token: None,
            draft_key_prefix: DEFAULT_DRAFT_KEY_PREFIX.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            configure_sqlite_connection(&conn_guard)?;
            ensure_schema(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err("配置键不能为空".into());
        }

        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now', 'localtime'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now', 'localtime')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, "配置已更新");
        Ok(())
    }

    /// 删除 global scope 配置, 之后读取将回落到默认值
    pub fn unset_config_value(&self, key: &str) -> ConfigResult<bool> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let rows = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key.trim()],
        )?;
        Ok(rows > 0)
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置
    pub fn list_configs(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            map.insert(key, value);
        }
        Ok(map)
    }

    // ===== 后端 =====

    pub fn get_backend_base_url(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::BACKEND_BASE_URL, DEFAULT_BACKEND_BASE_URL)?;
        Ok(value.trim_end_matches('/').to_string())
    }

    pub fn get_backend_timeout_ms(&self) -> ConfigResult<u64> {
        let value = self.get_config_or_default(
            config_keys::BACKEND_TIMEOUT_MS,
            &DEFAULT_BACKEND_TIMEOUT_MS.to_string(),
        )?;
        match value.parse::<u64>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(
                    config_key = config_keys::BACKEND_TIMEOUT_MS,
                    raw_value = %value,
                    "超时配置格式错误，使用默认值"
                );
                Ok(DEFAULT_BACKEND_TIMEOUT_MS)
            }
        }
    }

    pub fn get_backend_auth_token(&self) -> ConfigResult<Option<String>> {
        Ok(self
            .get_config_value(config_keys::BACKEND_AUTH_TOKEN)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    // ===== 草稿 =====

    pub fn get_draft_key_prefix(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::DRAFT_KEY_PREFIX, DEFAULT_DRAFT_KEY_PREFIX)
    }

    // ===== 界面 =====

    pub fn get_locale(&self) -> ConfigResult<String> {
        self.get_config_or_default(config_keys::UI_LOCALE, DEFAULT_LOCALE)
    }

    /// 一次性读取全部运行配置
    pub fn load_settings(&self) -> ConfigResult<MatchingSettings> {
        Ok(MatchingSettings {
            backend_base_url: self.get_backend_base_url()?,
            backend_timeout_ms: self.get_backend_timeout_ms()?,
            backend_auth_token: self.get_backend_auth_token()?,
            draft_key_prefix: self.get_draft_key_prefix()?,
            locale: self.get_locale()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 后端
    pub const BACKEND_BASE_URL: &str = "backend.base_url";
    pub const BACKEND_TIMEOUT_MS: &str = "backend.timeout_ms";
    pub const BACKEND_AUTH_TOKEN: &str = "backend.auth_token";

    // 草稿
    pub const DRAFT_KEY_PREFIX: &str = "draft.key_prefix";

    // 界面
    pub const UI_LOCALE: &str = "ui.locale";
}
