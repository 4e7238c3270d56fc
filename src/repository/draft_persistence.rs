// ==========================================
// 계란 로트 매칭 - 草稿持久化服务
// ==========================================
// 职责: 按订单 ID 保存/读取/删除배정草稿, 并通知订阅者
// 语义:
// - save: 无条件覆盖 (last save wins), 无合并/乐观锁/版本
// - load: 不存在、损坏或含无效项（托数 ≤ 0、重复 lot、枚数溢出）→ 规范空草稿, 从不报错
// - 写入失败: 返回 StorageUnavailable 等错误, 不通知订阅者
// ==========================================

use crate::domain::allocation::AllocationDraft;
use crate::engine::events::{DraftChangeKind, DraftEvent, DraftEventBus, SubscriptionId};
use crate::repository::draft_repo::DraftStore;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::Utc;
use std::sync::Arc;

/// 默认 key 前缀
pub const DEFAULT_DRAFT_KEY_PREFIX: &str = "egg_matching_draft:";

pub struct DraftPersistence {
    store: Arc<dyn DraftStore>,
    events: Arc<DraftEventBus>,
    key_prefix: String,
}

impl DraftPersistence {
    pub fn new(
        store: Arc<dyn DraftStore>,
        events: Arc<DraftEventBus>,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            store,
            events,
            key_prefix: key_prefix.into(),
        }
    }

    /// 使用默认前缀与独立的事件表
    pub fn with_store(store: Arc<dyn DraftStore>) -> Self {
        Self::new(store, Arc::new(DraftEventBus::new()), DEFAULT_DRAFT_KEY_PREFIX)
    }

    pub fn events(&self) -> &Arc<DraftEventBus> {
        &self.events
    }

    /// 订阅某订单的草稿变更
    pub fn on_draft_changed<F>(&self, order_id: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&DraftEvent) + Send + Sync + 'static,
    {
        self.events.on_draft_changed(order_id, callback)
    }

    fn key(&self, order_id: &str) -> String {
        format!("{}{}", self.key_prefix, order_id.trim())
    }

    fn validate_order_id(order_id: &str) -> RepositoryResult<()> {
        if order_id.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "order_id 不能为空".to_string(),
            ));
        }
        Ok(())
    }

    /// 保存草稿（覆盖）
    ///
    /// # 返回
    /// 带 updated_at 时间戳的已保存草稿
    pub fn save(&self, order_id: &str, draft: &AllocationDraft) -> RepositoryResult<AllocationDraft> {
        Self::validate_order_id(order_id)?;

        let mut stamped = draft.clone();
        stamped.updated_at = Some(Utc::now());
        let payload = serde_json::to_string(&stamped)?;

        if let Err(e) = self.store.put(&self.key(order_id), &payload) {
            tracing::warn!(order_id = %order_id.trim(), error = %e, "草稿保存失败");
            return Err(e);
        }

        tracing::info!(
            order_id = %order_id.trim(),
            items = stamped.items.len(),
            trays = stamped.total_trays(),
            "草稿已保存"
        );
        self.events
            .publish(&DraftEvent::new(order_id.trim(), DraftChangeKind::Saved));
        Ok(stamped)
    }

    /// 读取草稿; 任何异常都退化为空草稿
    pub fn load(&self, order_id: &str) -> AllocationDraft {
        if order_id.trim().is_empty() {
            return AllocationDraft::empty();
        }

        let raw = match self.store.get(&self.key(order_id)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return AllocationDraft::empty(),
            Err(e) => {
                tracing::warn!(order_id = %order_id.trim(), error = %e, "草稿读取失败, 按空草稿处理");
                return AllocationDraft::empty();
            }
        };

        match serde_json::from_str::<AllocationDraft>(&raw) {
            Ok(draft) => match draft.malformed_reason() {
                None => draft,
                Some(reason) => {
                    tracing::warn!(
                        order_id = %order_id.trim(),
                        reason = %reason,
                        "草稿内容无效, 按空草稿处理"
                    );
                    AllocationDraft::empty()
                }
            },
            Err(e) => {
                tracing::warn!(order_id = %order_id.trim(), error = %e, "草稿数据损坏, 按空草稿处理");
                AllocationDraft::empty()
            }
        }
    }

    /// 删除草稿; 不存在时为 no-op
    pub fn delete(&self, order_id: &str) -> RepositoryResult<bool> {
        Self::validate_order_id(order_id)?;

        let removed = self.store.remove(&self.key(order_id))?;
        if removed {
            tracing::info!(order_id = %order_id.trim(), "草稿已删除");
            self.events
                .publish(&DraftEvent::new(order_id.trim(), DraftChangeKind::Deleted));
        }
        Ok(removed)
    }

    /// 列出已保存草稿的订单 ID
    pub fn list_order_ids(&self) -> RepositoryResult<Vec<String>> {
        let keys = self.store.keys_with_prefix(&self.key_prefix)?;
        Ok(keys
            .into_iter()
            .filter_map(|k| k.strip_prefix(&self.key_prefix).map(str::to_string))
            .collect())
    }
}
