// ==========================================
// 계란 로트 매칭 - 核心库
// ==========================================
// 功能: 为已确认的采购订单挑选计란 lot, 跟踪배정进度,
//       本地保存草稿, 生成작업지시摘要
// 技术栈: Rust + SQLite + REST 后端
// 系统定位: 决策辅助 (不扣库存, 人工最终确认)
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "ko-KR");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 草稿存储
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 后端访问层 - 订单 / lot / 商品
pub mod backend;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 画面级操作
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{WeightGrade, EGGS_PER_TRAY};

// 领域实体
pub use domain::{AllocationDraft, AllocationItem, EggLot, EggLotId, Product, PurchaseOrder};

// 引擎
pub use engine::{
    AllocationTracker, DraftEventBus, EggLotRanker, RankedLots, WorkOrderGenerator,
    WorkOrderRejection, WorkOrderRequest, WorkOrderSummary,
};

// 持久化
pub use repository::{DraftPersistence, DraftStore, InMemoryDraftStore, SqliteDraftStore};

// 后端
pub use backend::{BackendClient, BackendError, HttpBackendClient, InMemoryBackend};

// API
pub use api::{ApiError, MatchingApi, MatchingProgress, MatchingSession};

// ==========================================
// 系统常量
// ==========================================

/// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 系统名称
pub const APP_NAME: &str = "계란 로트 매칭";
