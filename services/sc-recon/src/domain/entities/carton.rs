//! 装箱聚合

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::enums::CartonStatus;
use crate::domain::value_objects::{CartonId, PoNumber, SkuCode};
use crate::error::ScanError;

/// 一个入库箱，按采购单计划逐 SKU 核对
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carton {
    pub id: CartonId,
    pub po_number: PoNumber,
    /// 各 SKU 计划数量之和
    pub total_expected: u32,
    pub status: CartonStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Carton {
    pub fn new(id: CartonId, po_number: PoNumber, total_expected: u32) -> Self {
        let now = Utc::now();
        Self {
            id,
            po_number,
            total_expected,
            status: CartonStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// 终态装箱拒绝任何扫描
    pub fn ensure_accepting_scans(&self) -> Result<(), ScanError> {
        if self.status.accepts_scans() {
            Ok(())
        } else {
            Err(ScanError::invalid_state(format!(
                "carton {} is {}",
                self.id, self.status
            )))
        }
    }

    /// 按状态迁移表变更状态
    pub fn transition_to(&mut self, next: CartonStatus) -> Result<(), ScanError> {
        if !self.status.can_transition_to(next) {
            return Err(ScanError::invalid_state(format!(
                "carton {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// 计划行：装箱内某 SKU 的计划与已扫数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuPlanLine {
    pub carton_id: CartonId,
    pub sku: SkuCode,
    pub expected: u32,
    pub scanned: u32,
}

impl SkuPlanLine {
    pub fn new(carton_id: CartonId, sku: SkuCode, expected: u32) -> Self {
        Self {
            carton_id,
            sku,
            expected,
            scanned: 0,
        }
    }

    pub fn remaining(&self) -> u32 {
        self.expected.saturating_sub(self.scanned)
    }

    pub fn has_room(&self) -> bool {
        self.scanned < self.expected
    }

    pub fn is_complete(&self) -> bool {
        self.scanned >= self.expected
    }
}
