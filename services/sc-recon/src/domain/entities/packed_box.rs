//! 箱子与箱内扫描
//!
//! 箱子可以先于装箱独立校验，校验通过后整箱复用到装箱

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enums::{BoxStatus, ScanStatus};
use crate::domain::value_objects::{
    BoxDescriptor, BoxId, BoxScanId, CartonId, QrToken, ScanContext, SkuCode, Upc,
};
use crate::error::ScanError;

/// 带箱码的物理箱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackedBox {
    pub id: BoxId,
    /// 原始箱码，全局唯一
    pub code: String,
    pub descriptor: BoxDescriptor,
    pub carton_id: Option<CartonId>,
    pub validated: bool,
    pub status: BoxStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PackedBox {
    pub fn new(code: impl Into<String>, descriptor: BoxDescriptor) -> Self {
        let now = Utc::now();
        Self {
            id: BoxId::new(),
            code: code.into().trim().to_string(),
            descriptor,
            carton_id: None,
            validated: false,
            status: BoxStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn expected_sku(&self) -> &SkuCode {
        &self.descriptor.sku
    }

    pub fn expected_units(&self) -> u32 {
        self.descriptor.expected_units
    }

    /// 已校验的箱子不再接收扫描
    pub fn ensure_accepting_scans(&self) -> Result<(), ScanError> {
        if self.validated {
            return Err(ScanError::invalid_state(format!(
                "box {} is already validated",
                self.code
            )));
        }
        Ok(())
    }

    /// 匹配件数达标时标记为已校验，返回本次是否发生变化
    pub fn mark_validated_if_complete(&mut self, matching_units: u32) -> bool {
        if self.validated || matching_units < self.expected_units() {
            return false;
        }
        if !self.status.can_transition_to(BoxStatus::Validated) {
            return false;
        }
        self.validated = true;
        self.status = BoxStatus::Validated;
        self.updated_at = Utc::now();
        true
    }

    /// 两个条件同时满足才可复用
    pub fn is_reusable(&self) -> bool {
        self.validated && self.status == BoxStatus::Validated
    }

    pub fn assign_to(&mut self, carton_id: Option<CartonId>) {
        self.carton_id = carton_id;
        self.updated_at = Utc::now();
    }
}

/// 箱内扫描记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxScan {
    pub id: BoxScanId,
    pub box_id: BoxId,
    pub qr_token: QrToken,
    pub upc: Upc,
    /// 由目录解析出的实际 SKU
    pub sku: SkuCode,
    /// `Validated` 或 `SkuMismatch`
    pub status: ScanStatus,
    pub operator: String,
    pub device: String,
    pub scanned_at: DateTime<Utc>,
}

impl BoxScan {
    pub fn record(
        packed_box: &PackedBox,
        qr_token: QrToken,
        upc: Upc,
        sku: SkuCode,
        context: &ScanContext,
    ) -> Self {
        let status = if &sku == packed_box.expected_sku() {
            ScanStatus::Validated
        } else {
            ScanStatus::SkuMismatch
        };
        Self {
            id: BoxScanId::new(),
            box_id: packed_box.id,
            qr_token,
            upc,
            sku,
            status,
            operator: context.operator.clone(),
            device: context.device.clone(),
            scanned_at: Utc::now(),
        }
    }

    /// SKU 与箱码一致
    pub fn is_match(&self) -> bool {
        self.status.is_validated()
    }
}
