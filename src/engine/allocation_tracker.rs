// ==========================================
// 계란 로트 매칭 - 배정 跟踪器
// ==========================================
// 职责: 维护单个订单的 (lot, 托数) 草稿并计算进度
// 红线: 每个已存项 0 < tray_count ≤ 该 lot 可用托数
// 说明: 跟踪器本身没有 "已提交" 状态, 提交语义完全在持久化层
// ==========================================

use crate::domain::allocation::{AllocationDraft, AllocationItem};
use crate::domain::egg_lot::{EggLot, EggLotId};
use crate::domain::types::EGGS_PER_TRAY;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// 배정 输入校验错误（本地拒绝，不会发往后端）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("lot 不在当前列表中: lot_id={0}")]
    UnknownLot(EggLotId),

    #[error("lot 可用托数为 0, 不可选择: lot_id={lot_id}, quantity={quantity}")]
    LotNotSelectable { lot_id: EggLotId, quantity: i64 },
}

/// 草稿恢复结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: usize,
    /// 超过当前可用托数而被截断的项
    pub clamped: usize,
    /// lot 已不在列表中或托数 ≤ 0 而被丢弃的项
    pub dropped: usize,
}

// ==========================================
// AllocationTracker
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AllocationTracker {
    items: BTreeMap<EggLotId, AllocationItem>,
    /// lot_id → 可用托数
    availability: HashMap<EggLotId, i64>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以当前 lot 列表建立可用托数索引
    pub fn with_lots<'a>(lots: impl IntoIterator<Item = &'a EggLot>) -> Self {
        let mut tracker = Self::new();
        tracker.reindex(lots);
        tracker
    }

    /// 重建可用托数索引（lot 刷新后调用）
    ///
    /// 已配项按新的可用托数截断, lot 消失的项被移除。
    pub fn reindex<'a>(&mut self, lots: impl IntoIterator<Item = &'a EggLot>) {
        self.availability = lots
            .into_iter()
            .map(|lot| (lot.id, lot.available_trays()))
            .collect();

        let availability = &self.availability;
        self.items.retain(|lot_id, item| {
            let max = availability.get(lot_id).copied().unwrap_or(0);
            if max <= 0 {
                tracing::debug!(lot_id, "lot 已不可用, 移除배정项");
                return false;
            }
            if item.tray_count > max {
                item.tray_count = max;
            }
            true
        });
    }

    /// 该 lot 的可用托数（未索引时为 None）
    pub fn available_trays(&self, lot_id: EggLotId) -> Option<i64> {
        self.availability.get(&lot_id).copied()
    }

    // ==========================================
    // 编辑操作
    // ==========================================

    /// 选择 lot: 已存在则不变, 否则以 1 托加入
    ///
    /// # 返回
    /// - Ok(true): 新加入
    /// - Ok(false): 已存在（no-op）
    pub fn add(&mut self, lot: &EggLot) -> Result<bool, AllocationError> {
        if self.items.contains_key(&lot.id) {
            return Ok(false);
        }
        if !lot.is_selectable() {
            return Err(AllocationError::LotNotSelectable {
                lot_id: lot.id,
                quantity: lot.quantity,
            });
        }

        self.availability.insert(lot.id, lot.available_trays());
        self.items.insert(lot.id, AllocationItem::new(lot.id, 1));
        Ok(true)
    }

    /// 勾选框切换: 未选 → add, 已选 → remove
    ///
    /// # 返回
    /// 切换后是否处于选中状态
    pub fn toggle(&mut self, lot: &EggLot) -> Result<bool, AllocationError> {
        if self.remove(lot.id) {
            Ok(false)
        } else {
            self.add(lot)
        }
    }

    /// 设置托数
    ///
    /// - n ≤ 0: 移除该项
    /// - n > 可用托数: 截断到可用托数
    ///
    /// # 返回
    /// 实际生效的托数（被移除时为 0）
    pub fn set_tray_count(&mut self, lot_id: EggLotId, n: i64) -> Result<i64, AllocationError> {
        let max = self
            .availability
            .get(&lot_id)
            .copied()
            .ok_or(AllocationError::UnknownLot(lot_id))?;

        let effective = n.min(max);
        if effective <= 0 {
            self.items.remove(&lot_id);
            return Ok(0);
        }

        if effective < n {
            tracing::debug!(lot_id, requested = n, max, "托数超过可用量, 已截断");
        }

        self.items
            .entry(lot_id)
            .and_modify(|item| item.tray_count = effective)
            .or_insert_with(|| AllocationItem::new(lot_id, effective));
        Ok(effective)
    }

    /// 无条件移除
    pub fn remove(&mut self, lot_id: EggLotId) -> bool {
        self.items.remove(&lot_id).is_some()
    }

    /// 全部取消（UI 侧需先确认）
    pub fn clear(&mut self) {
        self.items.clear();
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn contains(&self, lot_id: EggLotId) -> bool {
        self.items.contains_key(&lot_id)
    }

    pub fn tray_count(&self, lot_id: EggLotId) -> Option<i64> {
        self.items.get(&lot_id).map(|i| i.tray_count)
    }

    pub fn items(&self) -> impl Iterator<Item = &AllocationItem> {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_allocated_trays(&self) -> i64 {
        self.items
            .values()
            .fold(0i64, |acc, i| acc.saturating_add(i.tray_count))
    }

    pub fn total_allocated_eggs(&self) -> i64 {
        self.total_allocated_trays().saturating_mul(EGGS_PER_TRAY)
    }

    /// 进度百分比 = min(100, round(已配托数 / 要求托数 * 100))
    ///
    /// 要求托数 ≤ 0 时为 0。
    pub fn progress_percent(&self, required_trays: i64) -> u8 {
        if required_trays <= 0 {
            return 0;
        }
        let pct = (self.total_allocated_trays() as f64 / required_trays as f64 * 100.0).round();
        pct.clamp(0.0, 100.0) as u8
    }

    // ==========================================
    // 草稿转换
    // ==========================================

    pub fn to_draft(&self) -> AllocationDraft {
        AllocationDraft::new(self.items.values().cloned().collect())
    }

    /// 从已保存草稿恢复
    ///
    /// 只恢复当前索引中存在的 lot, 并按可用托数截断; 存储中的草稿本身不被改写。
    pub fn restore(&mut self, draft: &AllocationDraft) -> RestoreReport {
        self.items.clear();
        let mut report = RestoreReport::default();

        for item in &draft.items {
            // 同一 lot 重复出现时只取第一项
            if self.items.contains_key(&item.egg_lot_id) || !item.is_valid() {
                report.dropped += 1;
                continue;
            }
            let Some(max) = self.availability.get(&item.egg_lot_id).copied() else {
                report.dropped += 1;
                continue;
            };
            // 旧草稿可能使用不同的每托枚数, 统一换算成托
            let trays = if item.eggs_per_tray != EGGS_PER_TRAY {
                item.eggs() / EGGS_PER_TRAY
            } else {
                item.tray_count
            };
            let effective = trays.min(max);
            if effective <= 0 {
                report.dropped += 1;
                continue;
            }
            if effective < trays {
                report.clamped += 1;
            }
            self.items
                .insert(item.egg_lot_id, AllocationItem::new(item.egg_lot_id, effective));
            report.restored += 1;
        }

        if report.clamped > 0 || report.dropped > 0 {
            tracing::warn!(
                restored = report.restored,
                clamped = report.clamped,
                dropped = report.dropped,
                "草稿与当前 lot 列表不一致, 已按当前可用量恢复"
            );
        }
        report
    }
}
