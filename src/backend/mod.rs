// ==========================================
// 계란 로트 매칭 - 后端访问层
// ==========================================
// 职责: 只读访问 REST 后端 (订单 / lot / 商品)
// 红线: 本层不发起任何写请求
// ==========================================

pub mod client;
pub mod error;
pub mod memory;

pub use client::{BackendClient, HttpBackendClient};
pub use error::{BackendError, BackendResult};
pub use memory::InMemoryBackend;
