//! 扫描上下文

use serde::{Deserialize, Serialize};

const DEFAULT_OPERATOR: &str = "system";
const DEFAULT_DEVICE: &str = "api";

/// 执行扫描的操作员与设备
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanContext {
    pub operator: String,
    pub device: String,
}

impl ScanContext {
    /// 空值回落为系统默认值
    pub fn new(operator: impl Into<String>, device: impl Into<String>) -> Self {
        Self {
            operator: non_empty_or(operator.into(), DEFAULT_OPERATOR),
            device: non_empty_or(device.into(), DEFAULT_DEVICE),
        }
    }

    pub fn system() -> Self {
        Self::new(DEFAULT_OPERATOR, DEFAULT_DEVICE)
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::system()
    }
}

fn non_empty_or(value: String, fallback: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}
