// ==========================================
// 계란 로트 매칭 - 로트 排序引擎
// ==========================================
// 职责: 按订单要求等级, 将可用 lot 划分为 基本(同等级) / 대체(更高等级)
// 输入: 要求等级 (可为空) + lot 列表
// 输出: RankedLots
// ==========================================

use crate::domain::egg_lot::EggLot;
use crate::domain::types::WeightGrade;
use std::cmp::Ordering;


/// 排序结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankedLots {
    /// 与要求等级一致，入库日降序
    pub base_lots: Vec<EggLot>,
    /// 高于要求等级的替代 lot，(等级升序, 入库日降序)
    pub substitute_lots: Vec<EggLot>,
}

impl RankedLots {
    /// 基本 → 替代 顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &EggLot> {
        self.base_lots.iter().chain(self.substitute_lots.iter())
    }

    /// 只遍历可选 lot（可用托数 > 0）
    pub fn selectable(&self) -> impl Iterator<Item = &EggLot> {
        self.iter().filter(|lot| lot.is_selectable())
    }

    pub fn len(&self) -> usize {
        self.base_lots.len() + self.substitute_lots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// EggLotRanker - 无状态引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct EggLotRanker;

impl EggLotRanker {
    pub fn new() -> Self {
        Self
    }

    /// 划分并排序
    ///
    /// 规则:
    /// 1) 等级 == R → base_lots, 入库日降序
    /// 2) rank(等级) > rank(R) → substitute_lots, 等级升序, 同等级内入库日降序
    /// 3) 低于 R 的 lot 不出现
    /// 4) R 为空: 全部视为 base_lots, substitute_lots 为空
    ///
    /// 可用数量 ≤ 0 的 lot 仍然列出（可见但不可选）。
    pub fn rank(&self, required: Option<WeightGrade>, lots: &[EggLot]) -> RankedLots {
        let Some(required) = required else {
            let mut base_lots = lots.to_vec();
            base_lots.sort_by(compare_received_desc);
            return RankedLots {
                base_lots,
                substitute_lots: Vec::new(),
            };
        };

        let mut base_lots = Vec::new();
        let mut substitute_lots = Vec::new();

        for lot in lots {
            match lot.weight_grade.rank().cmp(&required.rank()) {
                Ordering::Equal => base_lots.push(lot.clone()),
                Ordering::Greater => substitute_lots.push(lot.clone()),
                Ordering::Less => {}
            }
        }

        base_lots.sort_by(compare_received_desc);
        substitute_lots.sort_by(|a, b| {
            a.weight_grade
                .rank()
                .cmp(&b.weight_grade.rank())
                .then_with(|| compare_received_desc(a, b))
        });

        tracing::debug!(
            required = %required,
            base = base_lots.len(),
            substitute = substitute_lots.len(),
            skipped = lots.len() - base_lots.len() - substitute_lots.len(),
            "로트 排序完成"
        );

        RankedLots {
            base_lots,
            substitute_lots,
        }
    }
}

/// 入库日降序，同日按 id 升序（保证输出稳定）
fn compare_received_desc(a: &EggLot, b: &EggLot) -> Ordering {
    b.received_date
        .cmp(&a.received_date)
        .then_with(|| a.id.cmp(&b.id))
}
