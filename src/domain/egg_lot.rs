// ==========================================
// 계란 로트 매칭 - 계란 로트 实体
// ==========================================
// 所有权: 后端; 本模块只读
// ==========================================

use crate::domain::types::{WeightGrade, EGGS_PER_TRAY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type EggLotId = i64;

/// 계란 로트（입고 배치）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EggLot {
    pub id: EggLotId,
    pub weight_grade: WeightGrade,
    pub received_date: NaiveDate,
    #[serde(default)]
    pub laying_date: Option<NaiveDate>,
    /// 剩余可用数量（枚）
    pub quantity: i64,
    #[serde(default)]
    pub location: Option<String>,
}

impl EggLot {
    /// 可用托盘数 = floor(quantity / 30)，数量 ≤ 0 时为 0
    pub fn available_trays(&self) -> i64 {
        if self.quantity <= 0 {
            0
        } else {
            self.quantity / EGGS_PER_TRAY
        }
    }

    /// 可选: 至少有 1 整托
    pub fn is_selectable(&self) -> bool {
        self.available_trays() > 0
    }
}
