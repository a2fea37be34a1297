//! 错误处理模块
//!
//! 定义搜索会话的错误类型和错误分类。
//!
//! 网关错误（`Network` / `Protocol`）在会话层被转换为状态中的 `error`
//! 字符串；`Storage` 错误只记录日志，永远不会到达调用方。

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::ValidationError;

/// 应用程序错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    /// 网络错误（传输失败、超时、非 2xx 状态码）
    #[error("网络错误: {0}")]
    Network(String),

    /// 协议错误（响应结构不符合预期）
    #[error("协议错误: {0}")]
    Protocol(String),

    /// 参数验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 持久化存储错误
    #[error("存储错误: {0}")]
    Storage(String),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    /// 序列化错误
    #[error("序列化错误: {0}")]
    Serialization(String),

    /// IO 错误
    #[error("IO 错误: {0}")]
    Io(String),

    /// 内部错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Network,
    Protocol,
    Validation,
    Storage,
    Internal,
}

impl AppError {
    /// 超时错误
    pub fn timeout() -> Self {
        AppError::Network("timeout".to_string())
    }

    /// 获取错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Network(_) => ErrorKind::Network,
            AppError::Protocol(_) | AppError::Serialization(_) => ErrorKind::Protocol,
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Storage(_) | AppError::Io(_) => ErrorKind::Storage,
            AppError::Config(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// 错误详情（不带分类前缀）
    pub fn detail(&self) -> &str {
        match self {
            AppError::Network(d)
            | AppError::Protocol(d)
            | AppError::Validation(d)
            | AppError::Storage(d)
            | AppError::Config(d)
            | AppError::Serialization(d)
            | AppError::Io(d)
            | AppError::Internal(d) => d,
        }
    }

    /// 面向用户的错误消息，写入会话状态的 `error` 字段
    pub fn user_message(&self) -> String {
        match self.kind() {
            ErrorKind::Network if self.detail() == "timeout" => {
                "Сервер поиска не ответил вовремя. Попробуйте ещё раз.".to_string()
            }
            ErrorKind::Network => {
                format!("Не удалось выполнить поиск: {}", self.detail())
            }
            ErrorKind::Protocol => {
                "Сервер вернул неожиданный ответ. Попробуйте изменить запрос.".to_string()
            }
            ErrorKind::Validation => self.detail().to_string(),
            ErrorKind::Storage | ErrorKind::Internal => {
                "Произошла внутренняя ошибка.".to_string()
            }
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Serialization(e.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(e: figment::Error) -> Self {
        AppError::Config(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AppError::timeout()
        } else if e.is_decode() {
            AppError::Protocol(e.to_string())
        } else {
            AppError::Network(e.to_string())
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(e: ValidationError) -> Self {
        AppError::Validation(e.to_string())
    }
}

/// API 返回的错误响应体
///
/// 后端以 `{"detail": ...}` 或 `{"message": ...}` 的形式返回错误。
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorResponse {
    /// 错误详情
    pub detail: Option<serde_json::Value>,
    /// 错误消息
    pub message: Option<String>,
}

impl ErrorResponse {
    /// 提取可读的错误描述
    pub fn describe(&self) -> Option<String> {
        if let Some(message) = &self.message {
            return Some(message.clone());
        }
        match &self.detail {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(other) => Some(other.to_string()),
            None => None,
        }
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_mapping() {
        assert_eq!(AppError::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(AppError::Protocol("x".into()).kind(), ErrorKind::Protocol);
        assert_eq!(
            AppError::Serialization("x".into()).kind(),
            ErrorKind::Protocol
        );
        assert_eq!(AppError::Io("x".into()).kind(), ErrorKind::Storage);
        assert_eq!(AppError::timeout().detail(), "timeout");
    }

    #[test]
    fn test_user_message_keeps_validation_text() {
        let err = AppError::Validation("Введите запрос".into());
        assert_eq!(err.user_message(), "Введите запрос");
        assert!(AppError::timeout().user_message().contains("вовремя"));
    }

    #[test]
    fn test_error_response_describe() {
        let body: ErrorResponse = serde_json::from_str(r#"{"detail": "bad query"}"#).unwrap();
        assert_eq!(body.describe().as_deref(), Some("bad query"));

        let body: ErrorResponse =
            serde_json::from_str(r#"{"detail": [{"loc": ["body"]}]}"#).unwrap();
        assert!(body.describe().unwrap().contains("loc"));

        let body: ErrorResponse = serde_json::from_str("{}").unwrap();
        assert!(body.describe().is_none());
    }
}
