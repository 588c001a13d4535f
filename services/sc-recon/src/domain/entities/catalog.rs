//! 二维码目录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{QrToken, SkuCode, Upc};

/// 外部同步进来的二维码记录，同一令牌可能多次同步，以最新一条为准
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub qr_token: QrToken,
    pub upc: Upc,
    pub source: Option<String>,
    pub metadata: serde_json::Value,
    pub synced_at: DateTime<Utc>,
}

impl CatalogRecord {
    pub fn new(qr_token: impl Into<QrToken>, upc: impl Into<Upc>) -> Self {
        Self {
            qr_token: qr_token.into(),
            upc: upc.into(),
            source: None,
            metadata: serde_json::Value::Null,
            synced_at: Utc::now(),
        }
    }

    pub fn synced_at(mut self, at: DateTime<Utc>) -> Self {
        self.synced_at = at;
        self
    }
}

/// UPC 到 SKU 的映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcMapping {
    pub upc: Upc,
    pub sku: SkuCode,
}
