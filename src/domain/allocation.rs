// ==========================================
// 계란 로트 매칭 - 배정 草稿
// ==========================================
// 草稿只是本地的非权威数据: 不与后端对账、不扣减库存
// ==========================================

use crate::domain::egg_lot::EggLotId;
use crate::domain::types::EGGS_PER_TRAY;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

fn default_eggs_per_tray() -> i64 {
    EGGS_PER_TRAY
}

/// 배정 항목 (lot, 托数)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationItem {
    pub egg_lot_id: EggLotId,
    pub tray_count: i64,
    #[serde(default = "default_eggs_per_tray")]
    pub eggs_per_tray: i64,
}

impl AllocationItem {
    pub fn new(egg_lot_id: EggLotId, tray_count: i64) -> Self {
        Self {
            egg_lot_id,
            tray_count,
            eggs_per_tray: EGGS_PER_TRAY,
        }
    }

    /// 枚数; 溢出时饱和到 i64::MAX
    pub fn eggs(&self) -> i64 {
        self.tray_count.saturating_mul(self.eggs_per_tray)
    }

    /// 托数与每托枚数均为正, 且枚数不溢出
    pub fn is_valid(&self) -> bool {
        self.tray_count > 0
            && self.eggs_per_tray > 0
            && self.tray_count.checked_mul(self.eggs_per_tray).is_some()
    }
}

/// 배정 草稿（按订单保存）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationDraft {
    #[serde(default)]
    pub items: Vec<AllocationItem>,
    #[serde(default = "default_eggs_per_tray")]
    pub eggs_per_tray: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Default for AllocationDraft {
    fn default() -> Self {
        Self::empty()
    }
}

impl AllocationDraft {
    /// 规范空草稿 `{items: []}`
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            eggs_per_tray: EGGS_PER_TRAY,
            updated_at: None,
        }
    }

    pub fn new(items: Vec<AllocationItem>) -> Self {
        Self {
            items,
            ..Self::empty()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 有效项（托数 > 0）
    pub fn valid_items(&self) -> impl Iterator<Item = &AllocationItem> {
        self.items.iter().filter(|i| i.is_valid())
    }

    /// 已配托数, 只统计有效项
    pub fn total_trays(&self) -> i64 {
        self.valid_items()
            .fold(0i64, |acc, i| acc.saturating_add(i.tray_count))
    }

    /// 已配数量（枚）, 只统计有效项; 溢出时饱和
    pub fn total_eggs(&self) -> i64 {
        self.valid_items()
            .fold(0i64, |acc, i| acc.saturating_add(i.eggs()))
    }

    /// 存储数据的结构检查
    ///
    /// # 返回
    /// - None: 可以使用
    /// - Some(原因): 视为损坏
    pub fn malformed_reason(&self) -> Option<String> {
        if self.eggs_per_tray <= 0 {
            return Some(format!("eggsPerTray={}", self.eggs_per_tray));
        }

        let mut seen = HashSet::new();
        let mut total: i64 = 0;
        for item in &self.items {
            if !item.is_valid() {
                return Some(format!(
                    "lot {} trayCount={} eggsPerTray={}",
                    item.egg_lot_id, item.tray_count, item.eggs_per_tray
                ));
            }
            if !seen.insert(item.egg_lot_id) {
                return Some(format!("lot {} 重复", item.egg_lot_id));
            }
            total = match total.checked_add(item.eggs()) {
                Some(v) => v,
                None => return Some("枚数合计溢出".to_string()),
            };
        }
        None
    }
}
