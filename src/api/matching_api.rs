// ==========================================
// 계란 로트 매칭 - 매칭 API
// ==========================================
// 数据流:
// 选择订单 → 获取订单 + lot + 商品 → 排序划分 → 恢复草稿
// → 用户勾选/调整托数 → 保存草稿 → (另行) 生成작업지시摘要
// 红线: 任何步骤都不回写库存/订单
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::backend::client::BackendClient;
use crate::domain::allocation::AllocationDraft;
use crate::domain::egg_lot::{EggLot, EggLotId};
use crate::domain::order::PurchaseOrder;
use crate::domain::types::{WeightGrade, EGGS_PER_TRAY};
use crate::engine::allocation_tracker::{AllocationTracker, RestoreReport};
use crate::engine::lot_ranker::{EggLotRanker, RankedLots};
use crate::engine::work_order::{WorkOrderGenerator, WorkOrderRequest, WorkOrderSummary};
use crate::repository::draft_persistence::DraftPersistence;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 매칭 进度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingProgress {
    pub allocated_trays: i64,
    pub allocated_eggs: i64,
    pub required_trays: i64,
    pub required_eggs: i64,
    pub percent: u8,
    /// 已配枚数 == 要求枚数
    pub complete: bool,
}

// ==========================================
// MatchingSession - 单个订单的매칭画面状态
// ==========================================

/// 未保存的编辑只存在于会话中; 放弃会话即放弃编辑
#[derive(Debug, Clone)]
pub struct MatchingSession {
    order: PurchaseOrder,
    required_grade: Option<WeightGrade>,
    lots: Vec<EggLot>,
    ranked: RankedLots,
    tracker: AllocationTracker,
    restore_report: RestoreReport,
    dirty: bool,
}

impl MatchingSession {
    fn new(
        order: PurchaseOrder,
        required_grade: Option<WeightGrade>,
        lots: Vec<EggLot>,
        ranked: RankedLots,
        draft: &AllocationDraft,
    ) -> Self {
        let mut tracker = AllocationTracker::with_lots(ranked.iter());
        let restore_report = tracker.restore(draft);
        Self {
            order,
            required_grade,
            lots,
            ranked,
            tracker,
            restore_report,
            dirty: false,
        }
    }

    pub fn order(&self) -> &PurchaseOrder {
        &self.order
    }

    pub fn required_grade(&self) -> Option<WeightGrade> {
        self.required_grade
    }

    pub fn ranked(&self) -> &RankedLots {
        &self.ranked
    }

    pub fn tracker(&self) -> &AllocationTracker {
        &self.tracker
    }

    /// 后端返回的全部 lot（含低于要求等级的）
    pub fn lots(&self) -> &[EggLot] {
        &self.lots
    }

    pub fn restore_report(&self) -> &RestoreReport {
        &self.restore_report
    }

    /// 是否有未保存的修改
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// 在可见 lot（基本 + 替代）中查找
    pub fn lot(&self, lot_id: EggLotId) -> Option<&EggLot> {
        self.ranked.iter().find(|l| l.id == lot_id)
    }

    /// 勾选/取消勾选
    ///
    /// # 返回
    /// 切换后是否选中
    pub fn toggle_lot(&mut self, lot_id: EggLotId) -> ApiResult<bool> {
        let lot = self
            .ranked
            .iter()
            .find(|l| l.id == lot_id)
            .cloned()
            .ok_or_else(|| ApiError::InvalidInput(format!("lot 不在可选列表中: {}", lot_id)))?;
        let selected = self.tracker.toggle(&lot)?;
        self.dirty = true;
        Ok(selected)
    }

    /// 设置托数; 超过可用量截断, ≤ 0 移除
    pub fn set_tray_count(&mut self, lot_id: EggLotId, trays: i64) -> ApiResult<i64> {
        let effective = self.tracker.set_tray_count(lot_id, trays)?;
        self.dirty = true;
        Ok(effective)
    }

    /// 解析用户输入的托数文本; 非数字输入被拒绝, 当前值保持不变
    pub fn set_tray_count_input(&mut self, lot_id: EggLotId, input: &str) -> ApiResult<i64> {
        let trays = input
            .trim()
            .parse::<i64>()
            .map_err(|_| ApiError::InvalidInput(format!("托数必须是整数: {:?}", input)))?;
        self.set_tray_count(lot_id, trays)
    }

    pub fn remove_lot(&mut self, lot_id: EggLotId) -> bool {
        let removed = self.tracker.remove(lot_id);
        if removed {
            self.dirty = true;
        }
        removed
    }

    /// 全部取消; 必须由调用方先取得用户确认
    pub fn clear_all(&mut self, confirmed: bool) -> ApiResult<()> {
        if !confirmed {
            return Err(ApiError::ConfirmationRequired(
                "全部取消选择需要确认".to_string(),
            ));
        }
        if !self.tracker.is_empty() {
            self.tracker.clear();
            self.dirty = true;
        }
        Ok(())
    }

    pub fn required_trays(&self) -> i64 {
        self.order.confirmed_quantity.max(0)
    }

    pub fn progress(&self) -> MatchingProgress {
        let required_trays = self.required_trays();
        let allocated_eggs = self.tracker.total_allocated_eggs();
        let required_eggs = required_trays.saturating_mul(EGGS_PER_TRAY);
        MatchingProgress {
            allocated_trays: self.tracker.total_allocated_trays(),
            allocated_eggs,
            required_trays,
            required_eggs,
            percent: self.tracker.progress_percent(required_trays),
            complete: required_eggs > 0 && allocated_eggs == required_eggs,
        }
    }

    pub fn to_draft(&self) -> AllocationDraft {
        self.tracker.to_draft()
    }
}

// ==========================================
// MatchingApi
// ==========================================
pub struct MatchingApi {
    backend: Arc<dyn BackendClient>,
    drafts: Arc<DraftPersistence>,
    ranker: EggLotRanker,
    generator: WorkOrderGenerator,
}

impl MatchingApi {
    pub fn new(backend: Arc<dyn BackendClient>, drafts: Arc<DraftPersistence>) -> Self {
        Self {
            backend,
            drafts,
            ranker: EggLotRanker::new(),
            generator: WorkOrderGenerator::new(),
        }
    }

    pub fn drafts(&self) -> &Arc<DraftPersistence> {
        &self.drafts
    }

    /// 打开订单的매칭会话
    ///
    /// 失败时返回错误, 调用方持有的旧会话不受影响。
    pub async fn open_order(&self, order_id: &str) -> ApiResult<MatchingSession> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(ApiError::InvalidInput("order_id 不能为空".to_string()));
        }

        let (order, products, lots) = futures::try_join!(
            self.backend.fetch_order(order_id),
            self.backend.fetch_products(),
            self.backend.fetch_egg_lots(),
        )
        .map_err(|e| {
            tracing::warn!(order_id, error = %e, "매칭数据获取失败");
            ApiError::from(e)
        })?;

        let required_grade = order.resolve_required_grade(&products);
        if required_grade.is_none() {
            tracing::info!(order_id, "订单商品无等级定义, 全部 lot 视为基本 lot");
        }

        let ranked = self.ranker.rank(required_grade, &lots);
        let draft = self.drafts.load(&order.id);
        let session = MatchingSession::new(order, required_grade, lots, ranked, &draft);

        tracing::info!(
            order_id,
            required_grade = ?required_grade.map(|g| g.label()),
            base = session.ranked.base_lots.len(),
            substitute = session.ranked.substitute_lots.len(),
            restored_items = session.restore_report.restored,
            "매칭会话已打开"
        );
        Ok(session)
    }

    /// 重新获取 lot 并重排; 失败时会话保持不变
    pub async fn refresh_lots(&self, session: &mut MatchingSession) -> ApiResult<()> {
        let lots = self.backend.fetch_egg_lots().await.map_err(|e| {
            tracing::warn!(order_id = %session.order.id, error = %e, "lot 刷新失败, 保留原数据");
            ApiError::from(e)
        })?;

        let ranked = self.ranker.rank(session.required_grade, &lots);
        let before = session.tracker.to_draft();
        session.tracker.reindex(ranked.iter());
        if session.tracker.to_draft() != before {
            session.dirty = true;
        }
        session.lots = lots;
        session.ranked = ranked;
        Ok(())
    }

    /// 保存会话草稿（覆盖）
    pub fn save_session(&self, session: &mut MatchingSession) -> ApiResult<AllocationDraft> {
        let saved = self.drafts.save(&session.order.id, &session.to_draft())?;
        session.dirty = false;
        Ok(saved)
    }

    /// 删除已保存的草稿; 不存在时为 no-op
    pub fn discard_draft(&self, order_id: &str) -> ApiResult<bool> {
        Ok(self.drafts.delete(order_id)?)
    }

    /// 生成작업지시摘要（基于已保存草稿, 不回写库存）
    pub fn generate_work_order(
        &self,
        session: Option<&MatchingSession>,
        request: &WorkOrderRequest,
    ) -> ApiResult<WorkOrderSummary> {
        let Some(session) = session else {
            return Ok(self.generator.generate(None, &AllocationDraft::empty(), &[], request)?);
        };

        if session.is_dirty() {
            tracing::warn!(order_id = %session.order.id, "存在未保存的修改, 작업지시按已保存草稿生成");
        }

        let draft = self.drafts.load(&session.order.id);
        let summary =
            self.generator
                .generate(Some(&session.order), &draft, &session.lots, request)?;
        Ok(summary)
    }
}
