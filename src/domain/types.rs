// ==========================================
// 계란 로트 매칭 - 领域类型定义
// ==========================================
// 职责: 重量等级 (중량 등급) 与托盘常量
// 红线: 等级是全序枚举, rank 为 1..5 的全函数
// ==========================================

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// 1 托盘 (판) = 30 枚
pub const EGGS_PER_TRAY: i64 = 30;

// ==========================================
// 重量等级 (Weight Grade)
// ==========================================
// 소란 < 중란 < 대란 < 특란 < 왕란
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WeightGrade {
    Small,  // 소란
    Medium, // 중란
    Large,  // 대란
    XLarge, // 특란
    Jumbo,  // 왕란
}

impl WeightGrade {
    /// 全部等级，按 rank 升序
    pub const ALL: [WeightGrade; 5] = [
        WeightGrade::Small,
        WeightGrade::Medium,
        WeightGrade::Large,
        WeightGrade::XLarge,
        WeightGrade::Jumbo,
    ];

    /// 等级序号 (1..5)
    pub fn rank(&self) -> u8 {
        match self {
            WeightGrade::Small => 1,
            WeightGrade::Medium => 2,
            WeightGrade::Large => 3,
            WeightGrade::XLarge => 4,
            WeightGrade::Jumbo => 5,
        }
    }

    /// 韩文标签（后端与存储使用的格式）
    pub fn label(&self) -> &'static str {
        match self {
            WeightGrade::Small => "소란",
            WeightGrade::Medium => "중란",
            WeightGrade::Large => "대란",
            WeightGrade::XLarge => "특란",
            WeightGrade::Jumbo => "왕란",
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WeightGrade::Small => "SMALL",
            WeightGrade::Medium => "MEDIUM",
            WeightGrade::Large => "LARGE",
            WeightGrade::XLarge => "XLARGE",
            WeightGrade::Jumbo => "JUMBO",
        }
    }

    /// 从商品名中推断等级（取第一个出现的等级标签）
    ///
    /// 例: "특란 30구" → 특란
    pub fn infer_from_name(name: &str) -> Option<WeightGrade> {
        WeightGrade::ALL
            .iter()
            .filter_map(|g| name.find(g.label()).map(|pos| (pos, *g)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, g)| g)
    }
}

impl fmt::Display for WeightGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("未知重量等级: {0}")]
pub struct UnknownGrade(pub String);

impl FromStr for WeightGrade {
    type Err = UnknownGrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        WeightGrade::ALL
            .iter()
            .find(|g| g.label() == raw || g.code().eq_ignore_ascii_case(raw))
            .copied()
            .ok_or_else(|| UnknownGrade(raw.to_string()))
    }
}

impl Serialize for WeightGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for WeightGrade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
