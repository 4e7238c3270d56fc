// ==========================================
// 매칭 流程集成测试
// ==========================================
// 覆盖: 打开订单 → 勾选/调整托数 → 保存 → 重新打开恢复
//       → 작업지시生成 → 网络失败时会话保持
// ==========================================


use egg_lot_matching::api::{ApiError, MatchingApi};
use egg_lot_matching::backend::{BackendError, InMemoryBackend};
use egg_lot_matching::domain::{AllocationDraft, AllocationItem, WeightGrade};
use egg_lot_matching::engine::{AllocationError, DraftChangeKind, WorkOrderRejection, WorkOrderRequest};
use egg_lot_matching::repository::{
    DraftPersistence, InMemoryDraftStore, SqliteDraftStore, DEFAULT_DRAFT_KEY_PREFIX,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use test_helpers::{create_test_db, egg_lot, date, open_shared_connection, seeded_backend};

fn build_api() -> (MatchingApi, Arc<InMemoryBackend>, Arc<InMemoryDraftStore>) {
    let backend = Arc::new(seeded_backend());
    let store = Arc::new(InMemoryDraftStore::new());
    let drafts = Arc::new(DraftPersistence::with_store(store.clone()));
    let api = MatchingApi::new(backend.clone(), drafts);
    (api, backend, store)
}

fn ids<'a>(lots: impl IntoIterator<Item = &'a egg_lot_matching::EggLot>) -> Vec<i64> {
    lots.into_iter().map(|l| l.id).collect()
}

#[tokio::test]
async fn test_open_order_ranks_lots() {
    let (api, backend, _) = build_api();

    let session = api.open_order("PO-1").await.unwrap();

    assert_eq!(session.required_grade(), Some(WeightGrade::Large));
    assert_eq!(ids(&session.ranked().base_lots), vec![2, 1]);
    // 특란 在 왕란 之前; 중란 不出现
    assert_eq!(ids(&session.ranked().substitute_lots), vec![3, 5]);
    assert!(session.lot(4).is_none());
    assert!(session.tracker().is_empty());
    assert!(!session.is_dirty());
    // 订单 / 商品 / lot 各请求一次
    assert_eq!(backend.request_count(), 3);
}

#[tokio::test]
async fn test_open_order_rejects_blank_id_without_request() {
    let (api, backend, _) = build_api();

    let err = api.open_order("   ").await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert_eq!(backend.request_count(), 0);
}

#[tokio::test]
async fn test_open_unknown_order_is_not_found() {
    let (api, _, _) = build_api();

    let err = api.open_order("PO-404").await.unwrap_err();
    assert!(matches!(
        err,
        ApiError::Backend(BackendError::NotFound { .. })
    ));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_full_matching_flow() {
    let (api, _, _) = build_api();
    let mut session = api.open_order("PO-1").await.unwrap();

    // 勾选默认 1 托
    assert!(session.toggle_lot(1).unwrap());
    assert_eq!(session.tracker().tray_count(1), Some(1));
    assert!(session.is_dirty());

    assert_eq!(session.set_tray_count(1, 8).unwrap(), 8);
    assert!(session.toggle_lot(3).unwrap());
    assert_eq!(session.set_tray_count_input(3, " 2 ").unwrap(), 2);

    let progress = session.progress();
    assert_eq!(progress.allocated_trays, 10);
    assert_eq!(progress.allocated_eggs, 300);
    assert_eq!(progress.required_eggs, 300);
    assert_eq!(progress.percent, 100);
    assert!(progress.complete);

    let saved = api.save_session(&mut session).unwrap();
    assert!(saved.updated_at.is_some());
    assert!(!session.is_dirty());

    let summary = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("선별장 A"))
        .unwrap();
    assert_eq!(summary.order_id, "PO-1");
    assert_eq!(summary.matched_eggs, 300);
    assert_eq!(summary.confirmed_eggs, 300);
    assert_eq!(summary.lot_count, 2);
    assert_eq!(summary.work_location, "선별장 A");
    assert_eq!(summary.work_date, Some(date(2026, 2, 1)));
    assert!(!summary.inventory_applied);
}

#[tokio::test]
async fn test_reopen_restores_saved_draft() {
    let (api, _, _) = build_api();

    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(2).unwrap();
    session.set_tray_count(2, 3).unwrap();
    api.save_session(&mut session).unwrap();
    drop(session);

    let reopened = api.open_order("PO-1").await.unwrap();
    assert_eq!(reopened.tracker().tray_count(2), Some(3));
    assert_eq!(reopened.restore_report().restored, 1);
    assert!(!reopened.is_dirty());

    // 不同订单的草稿互不影响
    let other = api.open_order("PO-2").await.unwrap();
    assert!(other.tracker().is_empty());
}

#[tokio::test]
async fn test_unsaved_edits_are_lost_on_reopen() {
    let (api, _, _) = build_api();

    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    drop(session);

    let reopened = api.open_order("PO-1").await.unwrap();
    assert!(reopened.tracker().is_empty());
}

#[tokio::test]
async fn test_selection_rules() {
    let (api, _, _) = build_api();
    let mut session = api.open_order("PO-1").await.unwrap();

    // 不足一托的 lot 不可选
    let err = session.toggle_lot(5).unwrap_err();
    assert!(matches!(
        err,
        ApiError::Allocation(AllocationError::LotNotSelectable { lot_id: 5, .. })
    ));

    // 低于要求等级的 lot 不在候选中
    let err = session.toggle_lot(4).unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));

    // 托数超出可用量时截断: lot 2 = 150 枚 = 5 托
    session.toggle_lot(2).unwrap();
    assert_eq!(session.set_tray_count(2, 99).unwrap(), 5);

    // 非数字输入被拒绝, 原值保持
    let err = session.set_tray_count_input(2, "abc").unwrap_err();
    assert!(matches!(err, ApiError::InvalidInput(_)));
    assert_eq!(session.tracker().tray_count(2), Some(5));

    // ≤ 0 等同移除
    assert_eq!(session.set_tray_count(2, 0).unwrap(), 0);
    assert!(!session.tracker().contains(2));

    assert!(!session.remove_lot(2));
}

#[tokio::test]
async fn test_clear_all_requires_confirmation() {
    let (api, _, _) = build_api();
    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    session.toggle_lot(2).unwrap();

    let err = session.clear_all(false).unwrap_err();
    assert!(matches!(err, ApiError::ConfirmationRequired(_)));
    assert_eq!(session.tracker().len(), 2);

    session.clear_all(true).unwrap();
    assert!(session.tracker().is_empty());
    assert_eq!(session.progress().percent, 0);
}

#[tokio::test]
async fn test_refresh_failure_keeps_session() {
    let (api, backend, _) = build_api();
    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    session.set_tray_count(1, 4).unwrap();

    backend.set_offline(true);
    let err = api.refresh_lots(&mut session).await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(session.tracker().tray_count(1), Some(4));
    assert_eq!(ids(&session.ranked().base_lots), vec![2, 1]);

    // 打开其他订单失败时, 已有会话不受影响
    assert!(api.open_order("PO-2").await.is_err());
    assert_eq!(session.tracker().tray_count(1), Some(4));
}

#[tokio::test]
async fn test_refresh_clamps_to_new_availability() {
    let (api, backend, _) = build_api();
    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    session.set_tray_count(1, 10).unwrap();
    session.toggle_lot(2).unwrap();
    api.save_session(&mut session).unwrap();

    // lot 1 只剩 3 托, lot 2 已出库
    backend.set_lots(vec![egg_lot(1, WeightGrade::Large, date(2026, 1, 1), 90)]);
    api.refresh_lots(&mut session).await.unwrap();

    assert_eq!(session.tracker().tray_count(1), Some(3));
    assert!(!session.tracker().contains(2));
    assert!(session.is_dirty());
    assert_eq!(ids(&session.ranked().base_lots), vec![1]);
}

#[tokio::test]
async fn test_work_order_uses_saved_draft_exactly() {
    let (api, _, store) = build_api();
    let session = api.open_order("PO-1").await.unwrap();

    // 299 枚: 差一枚也拒绝
    store.insert_raw(
        &format!("{}PO-1", DEFAULT_DRAFT_KEY_PREFIX),
        r#"{"items":[{"eggLotId":1,"trayCount":1,"eggsPerTray":299}],"eggsPerTray":30}"#,
    );
    let err = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::IncompleteMatching {
            allocated: 299,
            required: 300
        })
    ));

    // 300 枚: 通过
    api.drafts()
        .save("PO-1", &AllocationDraft::new(vec![AllocationItem::new(1, 10)]))
        .unwrap();
    let summary = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("A"))
        .unwrap();
    assert_eq!(summary.matched_eggs, 300);
    assert_eq!(summary.lines.len(), 1);
}

#[tokio::test]
async fn test_stored_draft_with_invalid_items_is_treated_as_empty() {
    let (api, _, store) = build_api();
    let key = format!("{}PO-1", DEFAULT_DRAFT_KEY_PREFIX);

    // 11 托 + (-1) 托: 不能凑成 10 托
    store.insert_raw(
        &key,
        r#"{"items":[{"eggLotId":1,"trayCount":11},{"eggLotId":2,"trayCount":-1}]}"#,
    );
    let session = api.open_order("PO-1").await.unwrap();
    assert!(session.tracker().is_empty());

    let err = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::IncompleteMatching {
            allocated: 0,
            required: 300
        })
    ));

    store.insert_raw(
        &key,
        r#"{"items":[{"eggLotId":1,"trayCount":9223372036854775807}]}"#,
    );
    let session = api.open_order("PO-1").await.unwrap();
    assert!(session.tracker().is_empty());
    let err = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::IncompleteMatching { .. })
    ));
}

#[tokio::test]
async fn test_work_order_preconditions() {
    let (api, _, _) = build_api();

    let err = api
        .generate_work_order(None, &WorkOrderRequest::at("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::NoOrderSelected)
    ));

    let unconfirmed = api.open_order("PO-2").await.unwrap();
    let err = api
        .generate_work_order(Some(&unconfirmed), &WorkOrderRequest::at("A"))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::NotQuantityConfirmed { .. })
    ));

    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    session.set_tray_count(1, 10).unwrap();
    api.save_session(&mut session).unwrap();
    let err = api
        .generate_work_order(Some(&session), &WorkOrderRequest::at("  "))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::WorkOrderRejected(WorkOrderRejection::MissingWorkLocation)
    ));
    assert!(!err.user_message().is_empty());
}

#[tokio::test]
async fn test_draft_events_follow_persistence() {
    let (api, _, _) = build_api();
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    api.drafts().on_draft_changed("PO-1", move |event| {
        sink.lock().unwrap().push(event.kind);
    });

    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();
    api.save_session(&mut session).unwrap();

    assert!(api.discard_draft("PO-1").unwrap());
    // 再次删除: no-op, 不通知
    assert!(!api.discard_draft("PO-1").unwrap());

    assert_eq!(
        *events.lock().unwrap(),
        vec![DraftChangeKind::Saved, DraftChangeKind::Deleted]
    );
}

#[tokio::test]
async fn test_storage_failure_keeps_session_dirty() {
    let (api, _, store) = build_api();
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    api.drafts().on_draft_changed("", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let mut session = api.open_order("PO-1").await.unwrap();
    session.toggle_lot(1).unwrap();

    store.set_unavailable(true);
    let err = api.save_session(&mut session).unwrap_err();
    assert!(matches!(err, ApiError::Persistence(_)));
    assert!(err.is_retryable());
    assert!(session.is_dirty());
    assert_eq!(notified.load(Ordering::SeqCst), 0);

    store.set_unavailable(false);
    api.save_session(&mut session).unwrap();
    assert!(!session.is_dirty());
    assert_eq!(notified.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_draft_survives_restart_with_sqlite() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    {
        let store = Arc::new(SqliteDraftStore::new(open_shared_connection(&db_path)));
        let api = MatchingApi::new(
            Arc::new(seeded_backend()),
            Arc::new(DraftPersistence::with_store(store)),
        );
        let mut session = api.open_order("PO-1").await.unwrap();
        session.toggle_lot(3).unwrap();
        session.set_tray_count(3, 7).unwrap();
        api.save_session(&mut session).unwrap();
    }

    // 模拟重启: 新连接 / 新服务
    let store = Arc::new(SqliteDraftStore::new(open_shared_connection(&db_path)));
    let api = MatchingApi::new(
        Arc::new(seeded_backend()),
        Arc::new(DraftPersistence::with_store(store)),
    );
    let session = api.open_order("PO-1").await.unwrap();
    assert_eq!(session.tracker().tray_count(3), Some(7));
    assert_eq!(api.drafts().list_order_ids().unwrap(), vec!["PO-1".to_string()]);
}
