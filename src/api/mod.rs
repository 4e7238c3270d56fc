// ==========================================
// 계란 로트 매칭 - API 层
// ==========================================
// 职责: 组合 后端 / 引擎 / 持久化, 提供画面级操作
// ==========================================

pub mod error;
pub mod matching_api;

pub use error::{ApiError, ApiResult};
pub use matching_api::{MatchingApi, MatchingProgress, MatchingSession};
