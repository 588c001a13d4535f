//! 结箱决定

use serde::{Deserialize, Serialize};
use std::fmt;

use super::CartonStatus;

/// 结箱时的决定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalizeDecision {
    /// 确认收货并登记出货
    Confirm,
    /// 取消并撤销登记
    Cancel,
}

impl FinalizeDecision {
    /// 外部登记成功后的目标状态
    pub fn target_status(&self) -> CartonStatus {
        match self {
            FinalizeDecision::Confirm => CartonStatus::Completed,
            FinalizeDecision::Cancel => CartonStatus::Canceled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizeDecision::Confirm => "confirm",
            FinalizeDecision::Cancel => "cancel",
        }
    }
}

impl fmt::Display for FinalizeDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
