// ==========================================
// 계란 로트 매칭 - 仓储层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 本地存储失败必须可观测, 不允许静默丢弃
// ==========================================

use thiserror::Error;

/// 仓储层错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    // ===== 存储可用性 =====
    #[error("本地存储不可用: {0}")]
    StorageUnavailable(String),

    // ===== 数据库错误 =====
    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库锁获取失败: {0}")]
    LockError(String),

    #[error("数据库查询失败: {0}")]
    DatabaseQueryError(String),

    // ===== 数据质量错误 =====
    #[error("序列化失败: {0}")]
    SerializationError(String),

    #[error("数据验证失败: {0}")]
    ValidationError(String),

    // ===== 通用错误 =====
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// 实现 From<rusqlite::Error>
impl From<rusqlite::Error> for RepositoryError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(ffi_err, msg) => match ffi_err.code {
                rusqlite::ErrorCode::DiskFull
                | rusqlite::ErrorCode::ReadOnly
                | rusqlite::ErrorCode::CannotOpen
                | rusqlite::ErrorCode::PermissionDenied => RepositoryError::StorageUnavailable(
                    msg.clone().unwrap_or_else(|| err.to_string()),
                ),
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                    RepositoryError::LockError(err.to_string())
                }
                _ => RepositoryError::DatabaseQueryError(
                    msg.clone().unwrap_or_else(|| err.to_string()),
                ),
            },
            rusqlite::Error::QueryReturnedNoRows => RepositoryError::NotFound {
                entity: "Unknown".to_string(),
                id: "Unknown".to_string(),
            },
            _ => RepositoryError::DatabaseQueryError(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::SerializationError(err.to_string())
    }
}

/// Result 类型别名
pub type RepositoryResult<T> = Result<T, RepositoryError>;
