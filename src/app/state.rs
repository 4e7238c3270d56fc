// ==========================================
// 계란 로트 매칭 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::MatchingApi;
use crate::backend::{BackendClient, HttpBackendClient};
use crate::config::{ConfigManager, MatchingSettings};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::DraftEventBus;
use crate::repository::{DraftPersistence, SqliteDraftStore};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时解析的配置
    pub settings: MatchingSettings,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 草稿持久化服务（同时提供变更订阅）
    pub drafts: Arc<DraftPersistence>,

    /// 매칭 API
    pub matching_api: Arc<MatchingApi>,
}

impl AppState {
    /// 创建新的AppState实例（使用 HTTP 后端）
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    ///
    /// # 返回
    /// - Ok(AppState): 应用状态实例
    /// - Err(String): 初始化错误
    pub fn new(db_path: String) -> Result<Self, String> {
        Self::build(db_path, |settings| {
            let client = HttpBackendClient::new(
                &settings.backend_base_url,
                Duration::from_millis(settings.backend_timeout_ms),
                settings.backend_auth_token.clone(),
            )
            .map_err(|e| format!("无法创建后端客户端: {}", e))?;
            Ok(Arc::new(client) as Arc<dyn BackendClient>)
        })
    }

    /// 使用指定后端创建（离线演示 / 测试）
    pub fn with_backend(db_path: String, backend: Arc<dyn BackendClient>) -> Result<Self, String> {
        Self::build(db_path, move |_| Ok(backend))
    }

    fn build<F>(db_path: String, make_backend: F) -> Result<Self, String>
    where
        F: FnOnce(&MatchingSettings) -> Result<Arc<dyn BackendClient>, String>,
    {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        // 共享连接
        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("无法初始化数据库表: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // 配置读取失败不阻塞启动
        let settings = config_manager.load_settings().unwrap_or_else(|e| {
            tracing::warn!("配置读取失败, 使用默认配置: {}", e);
            MatchingSettings::default()
        });

        let effective_locale = crate::i18n::set_locale(&settings.locale);
        tracing::debug!(locale = effective_locale, "语言已设置");

        let store = Arc::new(SqliteDraftStore::new(conn));
        let drafts = Arc::new(DraftPersistence::new(
            store,
            Arc::new(DraftEventBus::new()),
            settings.draft_key_prefix.clone(),
        ));

        let backend = make_backend(&settings)?;
        let matching_api = Arc::new(MatchingApi::new(backend, drafts.clone()));

        tracing::info!(
            backend = %settings.backend_base_url,
            timeout_ms = settings.backend_timeout_ms,
            "AppState初始化完成"
        );

        Ok(Self {
            db_path,
            settings,
            config_manager,
            drafts,
            matching_api,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 EGG_MATCHING_DB_PATH（非空时）
/// - 开发环境: 用户数据目录/egg-lot-matching-dev/egg_matching.db
/// - 生产环境: 用户数据目录/egg-lot-matching/egg_matching.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("EGG_MATCHING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./egg_matching.db");

    if let Some(data_dir) = dirs::data_dir() {
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("egg-lot-matching-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("egg-lot-matching");
        }

        std::fs::create_dir_all(&path).ok();
        path = path.join("egg_matching.db");
    }

    path.to_string_lossy().to_string()
}
