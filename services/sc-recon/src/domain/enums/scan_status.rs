//! 扫描结果状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownStatus;

/// 单次扫描的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    /// 计入计划
    Validated,
    Duplicate,
    /// 箱内扫描的 SKU 与箱码不符，记录但不计数
    SkuMismatch,
    Error,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Validated => "VALIDATED",
            ScanStatus::Duplicate => "DUPLICATE",
            ScanStatus::SkuMismatch => "SKU_MISMATCH",
            ScanStatus::Error => "ERROR",
        }
    }

    pub fn is_validated(&self) -> bool {
        matches!(self, ScanStatus::Validated)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VALIDATED" => Ok(ScanStatus::Validated),
            "DUPLICATE" => Ok(ScanStatus::Duplicate),
            "SKU_MISMATCH" => Ok(ScanStatus::SkuMismatch),
            "ERROR" => Ok(ScanStatus::Error),
            other => Err(UnknownStatus {
                kind: "scan status",
                value: other.to_string(),
            }),
        }
    }
}
