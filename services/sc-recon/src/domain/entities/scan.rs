//! 装箱扫描记录

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enums::ScanStatus;
use crate::domain::value_objects::{BoxId, CartonId, QrToken, ScanContext, ScanId, SkuCode, Upc};

/// 一件被接收进装箱的商品
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    pub id: ScanId,
    pub carton_id: CartonId,
    pub sku: SkuCode,
    pub qr_token: QrToken,
    pub upc: Upc,
    pub status: ScanStatus,
    pub operator: String,
    pub device: String,
    /// 通过复用箱校验生成时指向来源箱
    pub source_box: Option<BoxId>,
    pub scanned_at: DateTime<Utc>,
}

impl Scan {
    pub fn validated(
        carton_id: CartonId,
        sku: SkuCode,
        qr_token: QrToken,
        upc: Upc,
        context: &ScanContext,
    ) -> Self {
        Self {
            id: ScanId::new(),
            carton_id,
            sku,
            qr_token,
            upc,
            status: ScanStatus::Validated,
            operator: context.operator.clone(),
            device: context.device.clone(),
            source_box: None,
            scanned_at: Utc::now(),
        }
    }

    pub fn from_box(mut self, source: BoxId) -> Self {
        self.source_box = Some(source);
        self
    }

    pub fn counts_toward_plan(&self) -> bool {
        self.status.is_validated()
    }
}
