//! 数据库行结构与领域对象的转换

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::entities::{
    BoxScan, Carton, CatalogRecord, PackedBox, PurchaseOrder, Scan, Sku, SkuPlanLine,
};
use crate::domain::repositories::ScanStatistics;
use crate::domain::value_objects::{BoxDescriptor, BoxId, BoxScanId, ScanId};

fn to_u32(value: i32, column: &str) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("column {} holds negative value {}", column, value))
}

#[derive(Debug, sqlx::FromRow)]
pub struct PurchaseOrderRow {
    pub po_number: String,
    pub supplier: String,
    pub status: String,
    pub notes: Option<String>,
}

impl PurchaseOrderRow {
    pub fn into_purchase_order(self) -> PurchaseOrder {
        PurchaseOrder {
            number: self.po_number.into(),
            supplier: self.supplier,
            status: self.status,
            notes: self.notes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SkuRow {
    pub sku_code: String,
    pub description: String,
    pub color: Option<String>,
    pub category: Option<String>,
    pub size: Option<String>,
}

impl SkuRow {
    pub fn into_sku(self) -> Sku {
        Sku {
            code: self.sku_code.into(),
            description: self.description,
            color: self.color,
            category: self.category,
            size: self.size,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CatalogRecordRow {
    pub qr_token: String,
    pub upc: String,
    pub source: Option<String>,
    pub metadata: serde_json::Value,
    pub synced_at: DateTime<Utc>,
}

impl CatalogRecordRow {
    pub fn into_record(self) -> CatalogRecord {
        CatalogRecord {
            qr_token: self.qr_token.into(),
            upc: self.upc.into(),
            source: self.source,
            metadata: self.metadata,
            synced_at: self.synced_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct CartonRow {
    pub carton_id: String,
    pub po_number: String,
    pub total_expected: i32,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartonRow {
    pub fn into_carton(self) -> Result<Carton, String> {
        Ok(Carton {
            id: self.carton_id.into(),
            po_number: self.po_number.into(),
            total_expected: to_u32(self.total_expected, "total_expected")?,
            status: self.status.parse().map_err(|e| format!("{}", e))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct PlanLineRow {
    pub carton_id: String,
    pub sku_code: String,
    pub expected: i32,
    pub scanned: i32,
}

impl PlanLineRow {
    pub fn into_line(self) -> Result<SkuPlanLine, String> {
        Ok(SkuPlanLine {
            carton_id: self.carton_id.into(),
            sku: self.sku_code.into(),
            expected: to_u32(self.expected, "expected")?,
            scanned: to_u32(self.scanned, "scanned")?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScanRow {
    pub scan_id: Uuid,
    pub carton_id: String,
    pub sku_code: String,
    pub qr_token: String,
    pub upc: String,
    pub status: String,
    pub operator: String,
    pub device: String,
    pub source_box_id: Option<Uuid>,
    pub scanned_at: DateTime<Utc>,
}

impl ScanRow {
    pub fn into_scan(self) -> Result<Scan, String> {
        Ok(Scan {
            id: ScanId::from_uuid(self.scan_id),
            carton_id: self.carton_id.into(),
            sku: self.sku_code.into(),
            qr_token: self.qr_token.into(),
            upc: self.upc.into(),
            status: self.status.parse().map_err(|e| format!("{}", e))?,
            operator: self.operator,
            device: self.device,
            source_box: self.source_box_id.map(BoxId::from_uuid),
            scanned_at: self.scanned_at,
        })
    }
}

/// `COUNT` 在 PostgreSQL 中为 BIGINT
#[derive(Debug, sqlx::FromRow)]
pub struct ScanStatisticsRow {
    pub total_cartons: i64,
    pub total_scans: i64,
    pub distinct_skus: i64,
    pub validated: i64,
    pub duplicate: i64,
    pub sku_mismatch: i64,
    pub error: i64,
}

impl ScanStatisticsRow {
    pub fn into_statistics(self) -> ScanStatistics {
        let count = |v: i64| v.max(0) as u64;
        ScanStatistics {
            total_cartons: count(self.total_cartons),
            total_scans: count(self.total_scans),
            distinct_skus: count(self.distinct_skus),
            validated: count(self.validated),
            duplicate: count(self.duplicate),
            sku_mismatch: count(self.sku_mismatch),
            error: count(self.error),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BoxRow {
    pub box_id: Uuid,
    pub box_code: String,
    pub box_date: NaiveDate,
    pub sku_code: String,
    pub expected_units: i32,
    pub sequence: i32,
    pub carton_id: Option<String>,
    pub validated: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BoxRow {
    pub fn into_box(self) -> Result<PackedBox, String> {
        Ok(PackedBox {
            id: BoxId::from_uuid(self.box_id),
            code: self.box_code,
            descriptor: BoxDescriptor {
                date: self.box_date,
                sku: self.sku_code.into(),
                expected_units: to_u32(self.expected_units, "expected_units")?,
                sequence: to_u32(self.sequence, "sequence")?,
            },
            carton_id: self.carton_id.map(Into::into),
            validated: self.validated,
            status: self.status.parse().map_err(|e| format!("{}", e))?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct BoxScanRow {
    pub box_scan_id: Uuid,
    pub box_id: Uuid,
    pub qr_token: String,
    pub upc: String,
    pub sku_code: String,
    pub status: String,
    pub operator: String,
    pub device: String,
    pub scanned_at: DateTime<Utc>,
}

impl BoxScanRow {
    pub fn into_box_scan(self) -> Result<BoxScan, String> {
        Ok(BoxScan {
            id: BoxScanId::from_uuid(self.box_scan_id),
            box_id: BoxId::from_uuid(self.box_id),
            qr_token: self.qr_token.into(),
            upc: self.upc.into(),
            sku: self.sku_code.into(),
            status: self.status.parse().map_err(|e| format!("{}", e))?,
            operator: self.operator,
            device: self.device,
            scanned_at: self.scanned_at,
        })
    }
}
