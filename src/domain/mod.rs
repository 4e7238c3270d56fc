// ==========================================
// 계란 로트 매칭 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod allocation;
pub mod egg_lot;
pub mod order;
pub mod types;

// 重导出核心类型
pub use allocation::{AllocationDraft, AllocationItem};
pub use egg_lot::{EggLot, EggLotId};
pub use order::{Product, PurchaseOrder};
pub use types::{UnknownGrade, WeightGrade, EGGS_PER_TRAY};
