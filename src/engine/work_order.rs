// ==========================================
// 계란 로트 매칭 - 작업지시 摘要生成
// ==========================================
// 职责: 校验前置条件并生成可读的작업지시 摘要
// 红线: 不回写库存/订单 (재고 미반영), 任何前置条件失败都不产出部分结果
// ==========================================

use crate::domain::allocation::AllocationDraft;
use crate::domain::egg_lot::{EggLot, EggLotId};
use crate::domain::order::PurchaseOrder;
use crate::domain::types::WeightGrade;
use crate::i18n::{t, t_with_args};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write as _;
use thiserror::Error;
use uuid::Uuid;

/// 前置条件失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkOrderRejection {
    #[error("未选择订单")]
    NoOrderSelected,

    #[error("订单尚未确认数量: order_id={order_id}")]
    NotQuantityConfirmed { order_id: String },

    #[error("매칭未完成: allocated={allocated}, required={required}")]
    IncompleteMatching { allocated: i64, required: i64 },

    #[error("未填写作业场所")]
    MissingWorkLocation,

    #[error("没有可解析的 lot 배정项")]
    NoResolvableLots,
}

impl WorkOrderRejection {
    /// 面向用户的原因文本（按当前语言）
    pub fn reason(&self) -> String {
        match self {
            WorkOrderRejection::NoOrderSelected => t("work_order.rejection.no_order"),
            WorkOrderRejection::NotQuantityConfirmed { order_id } => t_with_args(
                "work_order.rejection.not_confirmed",
                &[("order_id", order_id)],
            ),
            WorkOrderRejection::IncompleteMatching {
                allocated,
                required,
            } => t_with_args(
                "work_order.rejection.incomplete_matching",
                &[
                    ("allocated", &allocated.to_string()),
                    ("required", &required.to_string()),
                ],
            ),
            WorkOrderRejection::MissingWorkLocation => t("work_order.rejection.missing_location"),
            WorkOrderRejection::NoResolvableLots => t("work_order.rejection.no_resolvable_lots"),
        }
    }
}

/// 작업지시 参数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderRequest {
    pub work_location: String,
    #[serde(default)]
    pub work_date: Option<NaiveDate>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl WorkOrderRequest {
    pub fn at(location: impl Into<String>) -> Self {
        Self {
            work_location: location.into(),
            ..Self::default()
        }
    }
}

/// 摘要中的单个 lot 行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderLine {
    pub egg_lot_id: EggLotId,
    pub weight_grade: WeightGrade,
    pub location: Option<String>,
    pub received_date: NaiveDate,
    pub tray_count: i64,
    pub eggs: i64,
}

/// 작업지시 摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderSummary {
    pub work_order_no: String,
    pub order_id: String,
    pub product_name: Option<String>,
    pub confirmed_trays: i64,
    pub confirmed_eggs: i64,
    pub matched_eggs: i64,
    pub lot_count: usize,
    pub lines: Vec<WorkOrderLine>,
    pub work_location: String,
    pub work_date: Option<NaiveDate>,
    pub operator: Option<String>,
    pub note: Option<String>,
    pub generated_at: DateTime<Utc>,
    /// 恒为 false: 本步骤不扣减库存
    pub inventory_applied: bool,
}

impl WorkOrderSummary {
    /// 渲染为可读文本
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "[{}] {}", t("work_order.summary.title"), self.work_order_no);
        let _ = writeln!(out, "{}: {}", t("work_order.summary.order_id"), self.order_id);
        if let Some(name) = &self.product_name {
            let _ = writeln!(out, "{}: {}", t("work_order.summary.product"), name);
        }
        let _ = writeln!(
            out,
            "{}: {} ({})",
            t("work_order.summary.confirmed"),
            self.confirmed_eggs,
            t_with_args(
                "work_order.summary.trays",
                &[("trays", &self.confirmed_trays.to_string())]
            )
        );
        let _ = writeln!(out, "{}: {}", t("work_order.summary.matched"), self.matched_eggs);
        let _ = writeln!(out, "{}: {}", t("work_order.summary.lot_count"), self.lot_count);
        let _ = writeln!(out, "{}: {}", t("work_order.summary.location"), self.work_location);
        if let Some(date) = self.work_date {
            let _ = writeln!(out, "{}: {}", t("work_order.summary.work_date"), date);
        }
        if let Some(operator) = &self.operator {
            let _ = writeln!(out, "{}: {}", t("work_order.summary.operator"), operator);
        }
        for line in &self.lines {
            let _ = writeln!(
                out,
                "  - lot #{} {} {} / {} ({})",
                line.egg_lot_id,
                line.weight_grade,
                line.location.as_deref().unwrap_or("-"),
                line.eggs,
                t_with_args(
                    "work_order.summary.trays",
                    &[("trays", &line.tray_count.to_string())]
                )
            );
        }
        if let Some(note) = &self.note {
            let _ = writeln!(out, "{}: {}", t("work_order.summary.note"), note);
        }
        let _ = write!(out, "* {}", t("work_order.summary.inventory_notice"));
        out
    }
}

// ==========================================
// WorkOrderGenerator - 无状态引擎
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct WorkOrderGenerator;

impl WorkOrderGenerator {
    pub fn new() -> Self {
        Self
    }

    /// 生成작업지시 摘要
    ///
    /// 前置条件（按顺序, 全部满足才生成）:
    /// 1) 已选择订单
    /// 2) 确认数量 > 0
    /// 3) 已配枚数 == 确认托数 × 30（严格相等, 不是 "至少"）
    /// 4) 作业场所非空
    /// 5) 至少一项 lot 可解析且托数 > 0
    pub fn generate(
        &self,
        order: Option<&PurchaseOrder>,
        draft: &AllocationDraft,
        lots: &[EggLot],
        request: &WorkOrderRequest,
    ) -> Result<WorkOrderSummary, WorkOrderRejection> {
        let order = order.ok_or(WorkOrderRejection::NoOrderSelected)?;

        if !order.is_quantity_confirmed() {
            return Err(WorkOrderRejection::NotQuantityConfirmed {
                order_id: order.id.clone(),
            });
        }

        let required = order.required_eggs();
        let allocated = draft.total_eggs();
        if allocated != required {
            return Err(WorkOrderRejection::IncompleteMatching {
                allocated,
                required,
            });
        }

        let work_location = request.work_location.trim();
        if work_location.is_empty() {
            return Err(WorkOrderRejection::MissingWorkLocation);
        }

        let lot_index: HashMap<EggLotId, &EggLot> = lots.iter().map(|l| (l.id, l)).collect();
        let lines: Vec<WorkOrderLine> = draft
            .items
            .iter()
            .filter(|item| item.is_valid())
            .filter_map(|item| {
                lot_index.get(&item.egg_lot_id).map(|lot| WorkOrderLine {
                    egg_lot_id: lot.id,
                    weight_grade: lot.weight_grade,
                    location: lot.location.clone(),
                    received_date: lot.received_date,
                    tray_count: item.tray_count,
                    eggs: item.eggs(),
                })
            })
            .collect();

        if lines.is_empty() {
            return Err(WorkOrderRejection::NoResolvableLots);
        }
        let valid_items = draft.valid_items().count();
        if lines.len() < valid_items {
            tracing::warn!(
                order_id = %order.id,
                unresolved = valid_items - lines.len(),
                "部分배정项无法解析到 lot, 摘要中省略"
            );
        }

        let generated_at = Utc::now();
        let work_order_no = format!(
            "WO-{}-{}",
            generated_at.format("%Y%m%d"),
            &Uuid::new_v4().simple().to_string()[..8].to_uppercase()
        );

        tracing::info!(
            order_id = %order.id,
            work_order_no = %work_order_no,
            matched_eggs = allocated,
            lots = lines.len(),
            "작업지시 摘要已生成（재고 미반영）"
        );

        Ok(WorkOrderSummary {
            work_order_no,
            order_id: order.id.clone(),
            product_name: order.product_name.clone(),
            confirmed_trays: order.confirmed_quantity,
            confirmed_eggs: required,
            matched_eggs: allocated,
            lot_count: lines.len(),
            lines,
            work_location: work_location.to_string(),
            work_date: request.work_date.or(order.delivery_date),
            operator: request
                .operator
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            note: request
                .note
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            generated_at,
            inventory_applied: false,
        })
    }
}
