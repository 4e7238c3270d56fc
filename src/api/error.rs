// ==========================================
// 계란 로트 매칭 - API层错误类型
// ==========================================
// 职责: 汇总各层错误, 提供面向用户的消息
// 说明: 本子系统没有致命错误, 最坏结果是未保存的草稿丢失
// ==========================================

use crate::backend::error::BackendError;
use crate::engine::allocation_tracker::AllocationError;
use crate::engine::work_order::WorkOrderRejection;
use crate::i18n::t;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 输入校验 (本地拒绝, 不发往后端)
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error("操作需要确认: {0}")]
    ConfirmationRequired(String),

    // ==========================================
    // 작업지시 前置条件
    // ==========================================
    #[error("작업지시 生成被拒绝: {0}")]
    WorkOrderRejected(#[from] WorkOrderRejection),

    // ==========================================
    // 后端 / 本地存储
    // ==========================================
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error("本地草稿存储失败: {0}")]
    Persistence(#[from] RepositoryError),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 面向用户的消息; 작업지시拒绝与确认提示使用本地化文本
    pub fn user_message(&self) -> String {
        match self {
            ApiError::WorkOrderRejected(rejection) => rejection.reason(),
            ApiError::ConfirmationRequired(detail) => {
                format!("{}: {}", t("common.confirm_required"), detail)
            }
            other => other.to_string(),
        }
    }

    /// 是否可以由用户手动重试（网络/存储类错误）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ApiError::Backend(
                BackendError::Request(_) | BackendError::Timeout { .. } | BackendError::Status { .. }
            ) | ApiError::Persistence(
                RepositoryError::StorageUnavailable(_) | RepositoryError::LockError(_)
            )
        )
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
