// ==========================================
// 계란 로트 매칭 - 引擎层
// ==========================================
// 职责: 实现매칭业务规则, 不拼 SQL、不访问网络
// 红线: 引擎不修改库存, 所有拒绝必须输出 reason
// ==========================================

pub mod allocation_tracker;
pub mod events;
pub mod lot_ranker;
pub mod work_order;

// 重导出
pub use allocation_tracker::{AllocationError, AllocationTracker, RestoreReport};
pub use events::{DraftChangeKind, DraftEvent, DraftEventBus, SubscriptionId};
pub use lot_ranker::{EggLotRanker, RankedLots};
pub use work_order::{
    WorkOrderGenerator, WorkOrderLine, WorkOrderRejection, WorkOrderRequest, WorkOrderSummary,
};
