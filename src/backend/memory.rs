// ==========================================
// 계란 로트 매칭 - 内存后端
// ==========================================
// 用途: 集成测试 / 离线演示; 可注入网络失败
// ==========================================

use crate::backend::client::BackendClient;
use crate::backend::error::{BackendError, BackendResult};
use crate::domain::egg_lot::EggLot;
use crate::domain::order::{Product, PurchaseOrder};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct InMemoryBackend {
    orders: RwLock<HashMap<String, PurchaseOrder>>,
    lots: RwLock<Vec<EggLot>>,
    products: RwLock<Vec<Product>>,
    offline: AtomicBool,
    request_count: AtomicUsize,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_data(orders: Vec<PurchaseOrder>, lots: Vec<EggLot>, products: Vec<Product>) -> Self {
        let backend = Self::new();
        for order in orders {
            backend.put_order(order);
        }
        backend.set_lots(lots);
        backend.set_products(products);
        backend
    }

    pub fn put_order(&self, order: PurchaseOrder) {
        if let Ok(mut orders) = self.orders.write() {
            orders.insert(order.id.clone(), order);
        }
    }

    pub fn set_lots(&self, lots: Vec<EggLot>) {
        if let Ok(mut guard) = self.lots.write() {
            *guard = lots;
        }
    }

    pub fn set_products(&self, products: Vec<Product>) {
        if let Ok(mut guard) = self.products.write() {
            *guard = products;
        }
    }

    /// 模拟网络中断
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> BackendResult<()> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(BackendError::Request("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BackendClient for InMemoryBackend {
    async fn fetch_order(&self, order_id: &str) -> BackendResult<PurchaseOrder> {
        self.check_online()?;
        let orders = self
            .orders
            .read()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        orders
            .get(order_id.trim())
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                resource: "order".to_string(),
                id: order_id.trim().to_string(),
            })
    }

    async fn fetch_egg_lots(&self) -> BackendResult<Vec<EggLot>> {
        self.check_online()?;
        let lots = self
            .lots
            .read()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(lots.clone())
    }

    async fn fetch_products(&self) -> BackendResult<Vec<Product>> {
        self.check_online()?;
        let products = self
            .products
            .read()
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok(products.clone())
    }
}
