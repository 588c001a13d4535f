//! 服务错误定义

use recon_errors::AppError;
use thiserror::Error;

/// 扫码对账错误
///
/// 业务拒绝与基础设施故障分开，调用方据此决定提示用户还是重试
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Malformed box code: {0}")]
    MalformedCode(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("QR code {0} is not present in the catalog")]
    UnknownCode(String),

    #[error("UPC {0} is not mapped to any SKU")]
    UnmappedUpc(String),

    #[error("UPC mismatch: catalog has {expected}, label reads {received}")]
    UpcMismatch { expected: String, received: String },

    #[error("SKU {sku} is not part of carton {carton_id}")]
    SkuNotExpected { carton_id: String, sku: String },

    #[error("SKU {sku} already complete ({scanned}/{expected})")]
    QuotaExceeded {
        sku: String,
        expected: u32,
        scanned: u32,
    },

    #[error("QR code {qr_token} already scanned in {scope}")]
    DuplicateScan { qr_token: String, scope: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Locked: {0}")]
    LockedState(String),

    #[error("Nothing reusable: {reason}")]
    NothingReusable { reason: String },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("External shipment service error: {message}")]
    External {
        message: String,
        payload: Option<serde_json::Value>,
        timed_out: bool,
    },

    #[error(transparent)]
    Infrastructure(#[from] AppError),
}

pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// 稳定的错误码，用于日志、指标标签与逐项结果
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedCode(_) => "MALFORMED_CODE",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::UnknownCode(_) => "UNKNOWN_CODE",
            Self::UnmappedUpc(_) => "UNMAPPED_UPC",
            Self::UpcMismatch { .. } => "UPC_MISMATCH",
            Self::SkuNotExpected { .. } => "SKU_NOT_EXPECTED",
            Self::QuotaExceeded { .. } => "QUOTA_EXCEEDED",
            Self::DuplicateScan { .. } => "DUPLICATE_SCAN",
            Self::InvalidState(_) => "INVALID_STATE",
            Self::LockedState(_) => "LOCKED_STATE",
            Self::NothingReusable { .. } => "NOTHING_REUSABLE",
            Self::Conflict(_) => "CONFLICT",
            Self::Validation(_) => "VALIDATION",
            Self::External { .. } => "EXTERNAL",
            Self::Infrastructure(_) => "INFRASTRUCTURE",
        }
    }

    /// 重试同一请求是否可能成功
    ///
    /// 目录未命中可能是同步尚未完成；外部登记失败后装箱保持进行中
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::UnknownCode(_) | Self::UnmappedUpc(_) | Self::External { .. } => true,
            Self::Infrastructure(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// 复用时可以逐项记录并跳过的拒绝
    pub fn is_item_rejection(&self) -> bool {
        matches!(
            self,
            Self::SkuNotExpected { .. } | Self::QuotaExceeded { .. } | Self::DuplicateScan { .. }
        )
    }
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        let message = err.to_string();
        match err {
            ScanError::MalformedCode(_)
            | ScanError::Validation(_)
            | ScanError::UpcMismatch { .. }
            | ScanError::SkuNotExpected { .. } => AppError::validation(message),
            ScanError::NotFound { .. } | ScanError::UnknownCode(_) | ScanError::UnmappedUpc(_) => {
                AppError::not_found(message)
            }
            ScanError::QuotaExceeded { .. } => AppError::resource_exhausted(message),
            ScanError::DuplicateScan { .. } | ScanError::Conflict(_) => AppError::conflict(message),
            ScanError::InvalidState(_)
            | ScanError::LockedState(_)
            | ScanError::NothingReusable { .. } => AppError::failed_precondition(message),
            ScanError::External { .. } => AppError::external_service(message),
            ScanError::Infrastructure(e) => e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_errors_map_to_app_errors() {
        let quota: AppError = ScanError::QuotaExceeded {
            sku: "SKU-1".into(),
            expected: 2,
            scanned: 2,
        }
        .into();
        assert_eq!(quota.status_code(), 429);

        let dup: AppError = ScanError::DuplicateScan {
            qr_token: "Q1".into(),
            scope: "carton C-1".into(),
        }
        .into();
        assert!(matches!(dup, AppError::Conflict(_)));

        let locked: AppError = ScanError::LockedState("carton completed".into()).into();
        assert_eq!(locked.status_code(), 412);
    }

    #[test]
    fn test_infrastructure_error_passes_through() {
        let err: AppError = ScanError::from(AppError::database("connection reset")).into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_retryable_errors() {
        assert!(ScanError::UnknownCode("Q".into()).is_retryable());
        assert!(
            ScanError::External {
                message: "timeout".into(),
                payload: None,
                timed_out: true,
            }
            .is_retryable()
        );
        assert!(!ScanError::MalformedCode("x".into()).is_retryable());
        assert!(!ScanError::invalid_state("done").is_retryable());
    }

    #[test]
    fn test_item_rejections() {
        assert!(
            ScanError::SkuNotExpected {
                carton_id: "C".into(),
                sku: "S".into(),
            }
            .is_item_rejection()
        );
        assert!(!ScanError::from(AppError::internal("x")).is_item_rejection());
    }
}
