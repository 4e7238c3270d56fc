// ==========================================
// 계란 로트 매칭 - 발주 / 상품 实体
// ==========================================
// 所有权: 后端; 本模块只读
// ==========================================

use crate::domain::types::{WeightGrade, EGGS_PER_TRAY};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// 상품
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// 后端可能缺省或给出无法识别的值，此时为 None
    #[serde(default, deserialize_with = "lenient_grade")]
    pub weight_grade: Option<WeightGrade>,
}

impl Product {
    /// 要求等级: 显式字段优先，否则从商品名推断
    pub fn required_grade(&self) -> Option<WeightGrade> {
        self.weight_grade
            .or_else(|| WeightGrade::infer_from_name(&self.name))
    }
}

/// 발주（구매 주문）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrder {
    /// 后端可能给出数字 ID
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    /// 确认数量（托）
    #[serde(default)]
    pub confirmed_quantity: i64,
    #[serde(default)]
    pub delivery_date: Option<NaiveDate>,
}

impl PurchaseOrder {
    /// 要求数量（枚）
    pub fn required_eggs(&self) -> i64 {
        self.confirmed_quantity.max(0).saturating_mul(EGGS_PER_TRAY)
    }

    pub fn is_quantity_confirmed(&self) -> bool {
        self.confirmed_quantity > 0
    }

    /// 解析订单的要求等级
    ///
    /// 顺序: product_id 命中商品 → 商品名推断 → 订单上的商品名推断
    pub fn resolve_required_grade(&self, products: &[Product]) -> Option<WeightGrade> {
        let by_id = self
            .product_id
            .and_then(|pid| products.iter().find(|p| p.id == pid))
            .and_then(Product::required_grade);

        by_id.or_else(|| {
            self.product_name
                .as_deref()
                .and_then(WeightGrade::infer_from_name)
        })
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "订单 ID 必须是字符串或数字: {}",
            other
        ))),
    }
}

fn lenient_grade<'de, D>(deserializer: D) -> Result<Option<WeightGrade>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.parse().ok()))
}
