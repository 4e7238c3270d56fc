use super::{AllocationError, AllocationTracker};
use crate::domain::allocation::{AllocationDraft, AllocationItem};
use crate::domain::egg_lot::EggLot;
use crate::domain::types::WeightGrade;
use chrono::NaiveDate;

fn create_test_lot(id: i64, quantity: i64) -> EggLot {
    EggLot {
        id,
        weight_grade: WeightGrade::Large,
        received_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        laying_date: NaiveDate::from_ymd_opt(2025, 12, 30),
        quantity,
        location: None,
    }
}

fn assert_invariant(tracker: &AllocationTracker) {
    for item in tracker.items() {
        let max = tracker.available_trays(item.egg_lot_id).unwrap();
        assert!(item.tray_count > 0, "lot {} 托数必须 > 0", item.egg_lot_id);
        assert!(item.tray_count <= max, "lot {} 托数超过可用量", item.egg_lot_id);
    }
}

// ==========================================
// add / toggle
// ==========================================

#[test]
fn test_add_defaults_to_one_tray() {
    let lot = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(tracker.add(&lot), Ok(true));
    assert_eq!(tracker.tray_count(1), Some(1));
}

#[test]
fn test_add_existing_is_noop() {
    let lot = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&lot]);
    tracker.add(&lot).unwrap();
    tracker.set_tray_count(1, 7).unwrap();

    assert_eq!(tracker.add(&lot), Ok(false));
    assert_eq!(tracker.tray_count(1), Some(7));
}

#[test]
fn test_add_rejects_unselectable_lot() {
    let lot = create_test_lot(1, 29);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(
        tracker.add(&lot),
        Err(AllocationError::LotNotSelectable {
            lot_id: 1,
            quantity: 29
        })
    );
    assert!(tracker.is_empty());
}

#[test]
fn test_toggle_selects_then_deselects() {
    let lot = create_test_lot(5, 90);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(tracker.toggle(&lot), Ok(true));
    assert!(tracker.contains(5));
    assert_eq!(tracker.toggle(&lot), Ok(false));
    assert!(!tracker.contains(5));
}

// ==========================================
// set_tray_count
// ==========================================

#[test]
fn test_set_tray_count_clamps_to_available() {
    // 45 枚 → floor(45/30) = 1 托
    let lot = create_test_lot(1, 45);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(tracker.set_tray_count(1, 5), Ok(1));
    assert_eq!(tracker.tray_count(1), Some(1));
}

#[test]
fn test_set_tray_count_zero_or_negative_removes() {
    let lot = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&lot]);
    tracker.add(&lot).unwrap();

    assert_eq!(tracker.set_tray_count(1, 0), Ok(0));
    assert!(!tracker.contains(1));

    tracker.set_tray_count(1, 3).unwrap();
    assert_eq!(tracker.set_tray_count(1, -2), Ok(0));
    assert!(tracker.is_empty());
}

#[test]
fn test_set_tray_count_upserts() {
    let lot = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(tracker.set_tray_count(1, 4), Ok(4));
    assert_eq!(tracker.tray_count(1), Some(4));
}

#[test]
fn test_set_tray_count_unknown_lot() {
    let mut tracker = AllocationTracker::new();
    assert_eq!(
        tracker.set_tray_count(42, 1),
        Err(AllocationError::UnknownLot(42))
    );
}

#[test]
fn test_remove_and_clear() {
    let a = create_test_lot(1, 300);
    let b = create_test_lot(2, 300);
    let mut tracker = AllocationTracker::with_lots([&a, &b]);
    tracker.add(&a).unwrap();
    tracker.add(&b).unwrap();

    assert!(tracker.remove(1));
    assert!(!tracker.remove(1));
    assert_eq!(tracker.len(), 1);

    tracker.clear();
    assert!(tracker.is_empty());
    assert_eq!(tracker.total_allocated_trays(), 0);
}

// ==========================================
// 统计 / 进度
// ==========================================

#[test]
fn test_totals() {
    let a = create_test_lot(1, 300);
    let b = create_test_lot(2, 600);
    let mut tracker = AllocationTracker::with_lots([&a, &b]);
    tracker.set_tray_count(1, 4).unwrap();
    tracker.set_tray_count(2, 6).unwrap();

    assert_eq!(tracker.total_allocated_trays(), 10);
    assert_eq!(tracker.total_allocated_eggs(), 300);
}

#[test]
fn test_progress_percent() {
    let lot = create_test_lot(1, 3000);
    let mut tracker = AllocationTracker::with_lots([&lot]);

    assert_eq!(tracker.progress_percent(10), 0);
    tracker.set_tray_count(1, 1).unwrap();
    assert_eq!(tracker.progress_percent(3), 33);
    tracker.set_tray_count(1, 2).unwrap();
    assert_eq!(tracker.progress_percent(3), 67);
    tracker.set_tray_count(1, 50).unwrap();
    assert_eq!(tracker.progress_percent(3), 100);

    assert_eq!(tracker.progress_percent(0), 0);
    assert_eq!(tracker.progress_percent(-5), 0);
}

#[test]
fn test_progress_is_monotonic_and_capped() {
    let lot = create_test_lot(1, 30 * 40);
    let mut tracker = AllocationTracker::with_lots([&lot]);
    let mut last = 0;
    for n in 1..=40 {
        tracker.set_tray_count(1, n).unwrap();
        let pct = tracker.progress_percent(17);
        assert!(pct >= last);
        assert!(pct <= 100);
        last = pct;
    }
    assert_eq!(last, 100);
}

#[test]
fn test_invariant_after_mixed_operations() {
    let lots: Vec<EggLot> = (1..=6).map(|i| create_test_lot(i, i * 25)).collect();
    let mut tracker = AllocationTracker::with_lots(lots.iter());

    let script: Vec<(i64, i64)> = vec![
        (1, 3),
        (2, 9),
        (3, -1),
        (4, 2),
        (5, 100),
        (6, 5),
        (2, 0),
        (4, 1),
    ];
    for lot in &lots {
        let _ = tracker.add(lot);
        assert_invariant(&tracker);
    }
    for (lot_id, n) in script {
        tracker.set_tray_count(lot_id, n).unwrap();
        assert_invariant(&tracker);
    }
    tracker.remove(5);
    assert_invariant(&tracker);
}

// ==========================================
// 草稿转换 / reindex
// ==========================================

#[test]
fn test_restore_clamps_and_drops() {
    let a = create_test_lot(1, 90); // 3 托
    let b = create_test_lot(2, 300);
    let mut tracker = AllocationTracker::with_lots([&a, &b]);

    let draft = AllocationDraft::new(vec![
        AllocationItem::new(1, 5),
        AllocationItem::new(2, 2),
        AllocationItem::new(99, 1),
        AllocationItem::new(2, 0),
    ]);
    let report = tracker.restore(&draft);

    assert_eq!(report.restored, 2);
    assert_eq!(report.clamped, 1);
    assert_eq!(report.dropped, 2);
    assert_eq!(tracker.tray_count(1), Some(3));
    assert_eq!(tracker.tray_count(2), Some(2));
    assert!(!tracker.contains(99));
}

#[test]
fn test_restore_duplicate_lot_keeps_first() {
    let a = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&a]);

    let draft = AllocationDraft::new(vec![
        AllocationItem::new(1, 2),
        AllocationItem::new(1, 7),
    ]);
    let report = tracker.restore(&draft);

    assert_eq!(report.restored, 1);
    assert_eq!(report.dropped, 1);
    assert_eq!(tracker.len(), 1);
    assert_eq!(tracker.tray_count(1), Some(2));
}

#[test]
fn test_restore_drops_overflowing_item() {
    let a = create_test_lot(1, 300);
    let mut tracker = AllocationTracker::with_lots([&a]);

    let report = tracker.restore(&AllocationDraft::new(vec![AllocationItem::new(1, i64::MAX)]));

    assert_eq!(report.restored, 0);
    assert_eq!(report.dropped, 1);
    assert!(tracker.is_empty());
}

#[test]
fn test_to_draft_contains_items() {
    let a = create_test_lot(1, 300);
    let b = create_test_lot(2, 300);
    let mut tracker = AllocationTracker::with_lots([&a, &b]);
    tracker.set_tray_count(2, 3).unwrap();
    tracker.set_tray_count(1, 1).unwrap();

    let draft = tracker.to_draft();
    assert_eq!(draft.items.len(), 2);
    assert_eq!(draft.total_trays(), 4);
    assert_eq!(draft.eggs_per_tray, 30);
}

#[test]
fn test_reindex_shrinks_and_removes() {
    let a = create_test_lot(1, 300);
    let b = create_test_lot(2, 300);
    let mut tracker = AllocationTracker::with_lots([&a, &b]);
    tracker.set_tray_count(1, 8).unwrap();
    tracker.set_tray_count(2, 2).unwrap();

    let a_after = create_test_lot(1, 60);
    tracker.reindex([&a_after]);

    assert_eq!(tracker.tray_count(1), Some(2));
    assert!(!tracker.contains(2));
    assert_invariant(&tracker);
}
