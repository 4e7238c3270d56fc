// ==========================================
// 계란 로트 매칭 - 后端 REST 客户端
// ==========================================
// 职责: 只读获取 订单 / 계란 로트 / 상품
// 说明: 认证与令牌刷新由外层处理, 这里只附带已配置的 bearer token
// ==========================================

use crate::backend::error::{BackendError, BackendResult};
use crate::domain::egg_lot::EggLot;
use crate::domain::order::{Product, PurchaseOrder};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// 后端客户端 trait
///
/// 实现:
/// - `HttpBackendClient`: reqwest
/// - `InMemoryBackend`: 测试/离线
#[async_trait]
pub trait BackendClient: Send + Sync {
    async fn fetch_order(&self, order_id: &str) -> BackendResult<PurchaseOrder>;

    async fn fetch_egg_lots(&self) -> BackendResult<Vec<EggLot>>;

    async fn fetch_products(&self) -> BackendResult<Vec<Product>>;
}

/// 列表响应: 裸数组或 `{"data": [...]}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(v) => v,
            ListEnvelope::Wrapped { data } => data,
        }
    }
}

/// 单对象响应: 裸对象或 `{"data": {...}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ItemEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> ItemEnvelope<T> {
    pub(crate) fn into_inner(self) -> T {
        match self {
            ItemEnvelope::Wrapped { data } => data,
            ItemEnvelope::Bare(v) => v,
        }
    }
}

// ==========================================
// HttpBackendClient
// ==========================================
pub struct HttpBackendClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpBackendClient {
    /// # 参数
    /// - base_url: 例如 `https://erp.example.com/api`
    /// - timeout: 对全部请求统一生效的超时上限
    pub fn new(
        base_url: &str,
        timeout: Duration,
        auth_token: Option<String>,
    ) -> BackendResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(BackendError::Config("base_url 不能为空".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            auth_token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// 404 → Ok(None)
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> BackendResult<Option<T>> {
        let url = self.url(path);
        let mut request = self.http.get(&url);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        tracing::debug!(url = %url, "GET");
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(url = %url, status = status.as_u16(), "后端返回异常状态");
            return Err(BackendError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        let parsed = serde_json::from_str::<T>(&body)
            .map_err(|e| BackendError::Decode(format!("{}: {}", url, e)))?;
        Ok(Some(parsed))
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    async fn fetch_order(&self, order_id: &str) -> BackendResult<PurchaseOrder> {
        let id = order_id.trim();
        let body = self
            .get_json::<ItemEnvelope<PurchaseOrder>>(&format!("orders/{}", id))
            .await?;
        body.map(ItemEnvelope::into_inner)
            .ok_or_else(|| BackendError::NotFound {
                resource: "order".to_string(),
                id: id.to_string(),
            })
    }

    async fn fetch_egg_lots(&self) -> BackendResult<Vec<EggLot>> {
        let body = self.get_json::<ListEnvelope<EggLot>>("egg-lots").await?;
        Ok(body.map(ListEnvelope::into_vec).unwrap_or_default())
    }

    async fn fetch_products(&self) -> BackendResult<Vec<Product>> {
        let body = self.get_json::<ListEnvelope<Product>>("products").await?;
        Ok(body.map(ListEnvelope::into_vec).unwrap_or_default())
    }
}
