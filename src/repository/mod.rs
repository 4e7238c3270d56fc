// ==========================================
// 계란 로트 매칭 - 数据仓储层
// ==========================================
// 职责: 本地草稿存储与持久化服务
// 红线: 草稿是非权威数据, 不写后端、不扣库存
// ==========================================

pub mod draft_persistence;
pub mod draft_repo;
pub mod error;

// 重导出
pub use draft_persistence::{DraftPersistence, DEFAULT_DRAFT_KEY_PREFIX};
pub use draft_repo::{DraftStore, InMemoryDraftStore, SqliteDraftStore};
pub use error::{RepositoryError, RepositoryResult};
