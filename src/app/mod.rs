// ==========================================
// 계란 로트 매칭 - 应用层
// ==========================================
// 职责: 组装配置、存储、后端与 API
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
