// ==========================================
// 계란 로트 매칭 - 草稿变更事件
// ==========================================
// 职责: 显式的订阅/通知接口, 替代全局事件总线
// 说明: 本地存储不会在同一进程内自我通知, 保存/删除后由持久化层主动发布
// ==========================================

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DraftChangeKind {
    Saved,
    Deleted,
}

impl DraftChangeKind {
    pub fn as_str(&self) -> &str {
        match self {
            DraftChangeKind::Saved => "SAVED",
            DraftChangeKind::Deleted => "DELETED",
        }
    }
}

/// 草稿变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub order_id: String,
    pub kind: DraftChangeKind,
    pub occurred_at: DateTime<Utc>,
}

impl DraftEvent {
    pub fn new(order_id: impl Into<String>, kind: DraftChangeKind) -> Self {
        Self {
            order_id: order_id.into(),
            kind,
            occurred_at: Utc::now(),
        }
    }
}

pub type DraftCallback = Arc<dyn Fn(&DraftEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

struct Subscription {
    /// None 表示订阅全部订单
    order_id: Option<String>,
    callback: DraftCallback,
}

// ==========================================
// DraftEventBus
// ==========================================

/// 草稿变更订阅表
///
/// 回调在发布者线程中同步执行; 发布时先复制回调列表再释放锁,
/// 因此回调内可以安全地再次订阅或取消订阅。
#[derive(Default)]
pub struct DraftEventBus {
    next_id: AtomicU64,
    subscriptions: Mutex<BTreeMap<SubscriptionId, Subscription>>,
}

impl DraftEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订阅指定订单的草稿变更; order_id 为空字符串时订阅全部订单
    pub fn on_draft_changed<F>(&self, order_id: &str, callback: F) -> SubscriptionId
    where
        F: Fn(&DraftEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let order_id = order_id.trim();
        let subscription = Subscription {
            order_id: if order_id.is_empty() {
                None
            } else {
                Some(order_id.to_string())
            },
            callback: Arc::new(callback),
        };

        match self.subscriptions.lock() {
            Ok(mut subs) => {
                subs.insert(id, subscription);
            }
            Err(poisoned) => {
                tracing::warn!("订阅表锁已中毒, 继续使用: {}", poisoned);
                poisoned.into_inner().insert(id, subscription);
            }
        }
        id
    }

    /// 取消订阅
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        match self.subscriptions.lock() {
            Ok(mut subs) => subs.remove(&id).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(&id).is_some(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match self.subscriptions.lock() {
            Ok(subs) => subs.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// 发布事件
    ///
    /// # 返回
    /// 被通知的订阅者数量
    pub fn publish(&self, event: &DraftEvent) -> usize {
        let callbacks: Vec<DraftCallback> = {
            let subs = match self.subscriptions.lock() {
                Ok(subs) => subs,
                Err(poisoned) => poisoned.into_inner(),
            };
            subs.values()
                .filter(|s| {
                    s.order_id
                        .as_deref()
                        .map_or(true, |id| id == event.order_id)
                })
                .map(|s| s.callback.clone())
                .collect()
        };

        tracing::debug!(
            order_id = %event.order_id,
            kind = event.kind.as_str(),
            listeners = callbacks.len(),
            "发布草稿变更事件"
        );

        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_only_matching_order_is_notified() {
        let bus = DraftEventBus::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let h = hits.clone();
        bus.on_draft_changed("PO-1", move |e| {
            assert_eq!(e.order_id, "PO-1");
            h.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(&DraftEvent::new("PO-2", DraftChangeKind::Saved)), 0);
        assert_eq!(bus.publish(&DraftEvent::new("PO-1", DraftChangeKind::Saved)), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wildcard_subscription() {
        let bus = DraftEventBus::new();
        let kinds = Arc::new(Mutex::new(Vec::new()));

        let k = kinds.clone();
        bus.on_draft_changed("", move |e| k.lock().unwrap().push(e.kind));

        bus.publish(&DraftEvent::new("A", DraftChangeKind::Saved));
        bus.publish(&DraftEvent::new("B", DraftChangeKind::Deleted));

        assert_eq!(
            *kinds.lock().unwrap(),
            vec![DraftChangeKind::Saved, DraftChangeKind::Deleted]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = DraftEventBus::new();
        let id = bus.on_draft_changed("PO-1", |_| panic!("不应被调用"));
        assert_eq!(bus.subscriber_count(), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.publish(&DraftEvent::new("PO-1", DraftChangeKind::Saved)), 0);
    }
}
