// ==========================================
// 계란 로트 매칭 - 后端访问错误
// ==========================================
// 说明: 后端错误均非致命, 由调用方以内联消息展示, 重试由用户手动触发
// ==========================================

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("后端资源不存在: {resource} ({id})")]
    NotFound { resource: String, id: String },

    #[error("后端请求失败: {0}")]
    Request(String),

    #[error("后端请求超时: {url}")]
    Timeout { url: String },

    #[error("后端返回异常状态: status={status}, url={url}")]
    Status { status: u16, url: String },

    #[error("后端响应解析失败: {0}")]
    Decode(String),

    #[error("后端客户端配置错误: {0}")]
    Config(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "-".to_string());
        if err.is_timeout() {
            BackendError::Timeout { url }
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            BackendError::Status {
                status: status.as_u16(),
                url,
            }
        } else {
            BackendError::Request(err.to_string())
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;
