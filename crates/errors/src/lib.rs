//! recon-errors - 统一错误处理
//!
//! 基于 RFC 7807 Problem Details 规范

use serde::{Deserialize, Serialize};
use thiserror::Error;

const PROBLEM_BASE: &str = "https://problems.inbound-recon.dev";

/// 基础设施与应用层共用的错误类型
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Failed precondition: {0}")]
    FailedPrecondition(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn failed_precondition(msg: impl Into<String>) -> Self {
        Self::FailedPrecondition(msg.into())
    }

    pub fn resource_exhausted(msg: impl Into<String>) -> Self {
        Self::ResourceExhausted(msg.into())
    }

    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    pub fn external_service(msg: impl Into<String>) -> Self {
        Self::ExternalService(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// 错误类别标识，用于 problem type 与日志字段
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not-found",
            Self::Validation(_) => "validation",
            Self::Conflict(_) => "conflict",
            Self::FailedPrecondition(_) => "failed-precondition",
            Self::ResourceExhausted(_) => "resource-exhausted",
            Self::Database(_) => "database",
            Self::ExternalService(_) => "external-service",
            Self::Internal(_) => "internal",
        }
    }

    /// 转换为 HTTP 状态码
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Validation(_) => 400,
            Self::Conflict(_) => 409,
            Self::FailedPrecondition(_) => 412,
            Self::ResourceExhausted(_) => 429,
            Self::Database(_) | Self::Internal(_) => 500,
            Self::ExternalService(_) => 502,
        }
    }

    /// 调用方是否可以原样重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::ExternalService(_))
    }

    /// 转换为 Problem Details
    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            r#type: format!("{}/{}", PROBLEM_BASE, self.kind()),
            title: self.title().to_string(),
            status: self.status_code(),
            detail: self.to_string(),
            instance: None,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "Resource Not Found",
            Self::Validation(_) => "Validation Error",
            Self::Conflict(_) => "Conflict",
            Self::FailedPrecondition(_) => "Failed Precondition",
            Self::ResourceExhausted(_) => "Resource Exhausted",
            Self::Database(_) => "Database Error",
            Self::ExternalService(_) => "External Service Error",
            Self::Internal(_) => "Internal Server Error",
        }
    }
}

/// RFC 7807 Problem Details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub r#type: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ProblemDetails {
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }
}

/// Result 类型别名
pub type AppResult<T> = Result<T, AppError>;
