//! 采购单与 SKU 主数据
//!
//! 由上游维护，对账流程只读

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{PoNumber, SkuCode};

/// 采购单
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub number: PoNumber,
    pub supplier: String,
    pub status: String,
    pub notes: Option<String>,
}

impl PurchaseOrder {
    pub fn new(number: impl Into<PoNumber>, supplier: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            supplier: supplier.into(),
            status: "OPEN".to_string(),
            notes: None,
        }
    }
}

/// SKU 主数据
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub code: SkuCode,
    pub description: String,
    pub color: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
}

impl Sku {
    pub fn new(code: impl Into<SkuCode>, description: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            description: description.into(),
            color: None,
            category: None,
            size: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn with_size(mut self, size: impl Into<String>) -> Self {
        self.size = Some(size.into());
        self
    }
}
