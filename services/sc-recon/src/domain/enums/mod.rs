//! 枚举模块

mod box_status;
mod carton_status;
mod finalize_decision;
mod scan_status;

pub use box_status::BoxStatus;
pub use carton_status::CartonStatus;
pub use finalize_decision::FinalizeDecision;
pub use scan_status::ScanStatus;

/// 状态值无法识别
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind} value: {value}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}
