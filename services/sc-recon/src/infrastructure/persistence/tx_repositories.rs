//! 事务感知的 Repository 实现
//!
//! 所有 Repository 共享同一个 Transaction，锁定读使用 `FOR UPDATE`。

use async_trait::async_trait;
use recon_adapter_postgres::map_sqlx_error;
use recon_errors::{AppError, AppResult};
use sqlx::{Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::rows::{
    BoxRow, BoxScanRow, CartonRow, CatalogRecordRow, PlanLineRow, PurchaseOrderRow, ScanRow,
    ScanStatisticsRow, SkuRow,
};
use crate::domain::entities::{
    BoxScan, Carton, CatalogRecord, PackedBox, PurchaseOrder, Scan, Sku, SkuPlanLine,
};
use crate::domain::enums::CartonStatus;
use crate::domain::repositories::{
    BoxRepository, BoxScanRepository, CartonRepository, CatalogRepository, LedgerRepository,
    MasterDataRepository, ReleaseOutcome, ReserveOutcome, ScanRepository, ScanStatistics,
};
use crate::domain::value_objects::{
    BoxId, BoxScanId, CartonId, PoNumber, QrToken, ScanId, SkuCode, Upc,
};

/// 共享事务类型
pub(super) type SharedTx = Arc<Mutex<Option<Transaction<'static, Postgres>>>>;

/// 宏：定义一个简单的 TxRepository 结构体
macro_rules! define_tx_repo {
    ($name:ident) => {
        pub struct $name {
            tx: SharedTx,
        }

        impl $name {
            pub fn new(tx: SharedTx) -> Self {
                Self { tx }
            }
        }
    };
}

define_tx_repo!(TxCartonRepository);
define_tx_repo!(TxLedgerRepository);
define_tx_repo!(TxScanRepository);
define_tx_repo!(TxBoxRepository);
define_tx_repo!(TxBoxScanRepository);
define_tx_repo!(TxCatalogRepository);
define_tx_repo!(TxMasterDataRepository);

const CARTON_COLUMNS: &str =
    "carton_id, po_number, total_expected, status, created_at, updated_at";
const PLAN_COLUMNS: &str = "carton_id, sku_code, expected, scanned";
const SCAN_COLUMNS: &str = "scan_id, carton_id, sku_code, qr_token, upc, status, operator, device, source_box_id, scanned_at";
const BOX_COLUMNS: &str = "box_id, box_code, box_date, sku_code, expected_units, sequence, carton_id, validated, status, created_at, updated_at";
const BOX_SCAN_COLUMNS: &str =
    "box_scan_id, box_id, qr_token, upc, sku_code, status, operator, device, scanned_at";

fn to_i32(value: u32, column: &str) -> AppResult<i32> {
    i32::try_from(value)
        .map_err(|_| AppError::validation(format!("{} {} is out of range", column, value)))
}

// =============================================================================
// CartonRepository 实现
// =============================================================================

impl TxCartonRepository {
    async fn select(&self, id: &CartonId, for_update: bool) -> AppResult<Option<Carton>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM cartons WHERE carton_id = $1{}",
            CARTON_COLUMNS,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let row = sqlx::query_as::<_, CartonRow>(&sql)
            .bind(id.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_carton().map_err(AppError::database))
            .transpose()
    }
}

#[async_trait]
impl CartonRepository for TxCartonRepository {
    async fn find_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>> {
        self.select(id, false).await
    }

    async fn lock_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>> {
        self.select(id, true).await
    }

    async fn insert(&self, carton: &Carton, plan: &[SkuPlanLine]) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        sqlx::query(
            r#"
            INSERT INTO cartons (carton_id, po_number, total_expected, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(carton.id.as_str())
        .bind(carton.po_number.as_str())
        .bind(to_i32(carton.total_expected, "total_expected")?)
        .bind(carton.status.as_str())
        .bind(carton.created_at)
        .bind(carton.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        for line in plan {
            sqlx::query(
                r#"
                INSERT INTO carton_sku_plans (carton_id, sku_code, expected, scanned)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(line.carton_id.as_str())
            .bind(line.sku.as_str())
            .bind(to_i32(line.expected, "expected")?)
            .bind(to_i32(line.scanned, "scanned")?)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;
        }

        Ok(())
    }

    async fn update_status(&self, id: &CartonId, status: CartonStatus) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let result =
            sqlx::query("UPDATE cartons SET status = $2, updated_at = NOW() WHERE carton_id = $1")
                .bind(id.as_str())
                .bind(status.as_str())
                .execute(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("carton {}", id)));
        }
        Ok(())
    }
}

// =============================================================================
// LedgerRepository 实现
// =============================================================================

#[async_trait]
impl LedgerRepository for TxLedgerRepository {
    async fn plan_lines(&self, carton_id: &CartonId) -> AppResult<Vec<SkuPlanLine>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM carton_sku_plans WHERE carton_id = $1 ORDER BY sku_code",
            PLAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, PlanLineRow>(&sql)
            .bind(carton_id.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|r| r.into_line().map_err(AppError::database))
            .collect()
    }

    async fn find_line(
        &self,
        carton_id: &CartonId,
        sku: &SkuCode,
    ) -> AppResult<Option<SkuPlanLine>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM carton_sku_plans WHERE carton_id = $1 AND sku_code = $2",
            PLAN_COLUMNS
        );
        let row = sqlx::query_as::<_, PlanLineRow>(&sql)
            .bind(carton_id.as_str())
            .bind(sku.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_line().map_err(AppError::database))
            .transpose()
    }

    async fn reserve_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReserveOutcome> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        // 条件更新：并发下至多 expected 次成功
        let sql = format!(
            r#"
            UPDATE carton_sku_plans
            SET scanned = scanned + 1
            WHERE carton_id = $1 AND sku_code = $2 AND scanned < expected
            RETURNING {}
            "#,
            PLAN_COLUMNS
        );
        let updated = sqlx::query_as::<_, PlanLineRow>(&sql)
            .bind(carton_id.as_str())
            .bind(sku.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        if let Some(row) = updated {
            let line = row.into_line().map_err(AppError::database)?;
            return Ok(ReserveOutcome::Reserved(line));
        }

        let current = sqlx::query_as::<_, PlanLineRow>(&format!(
            "SELECT {} FROM carton_sku_plans WHERE carton_id = $1 AND sku_code = $2",
            PLAN_COLUMNS
        ))
        .bind(carton_id.as_str())
        .bind(sku.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        match current {
            Some(row) => {
                let line = row.into_line().map_err(AppError::database)?;
                Ok(ReserveOutcome::Exhausted {
                    expected: line.expected,
                    scanned: line.scanned,
                })
            }
            None => Ok(ReserveOutcome::NotPlanned),
        }
    }

    async fn release_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReleaseOutcome> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let updated = sqlx::query_as::<_, PlanLineRow>(
            r#"
            UPDATE carton_sku_plans p
            SET scanned = p.scanned - 1
            FROM cartons c
            WHERE c.carton_id = p.carton_id
              AND p.carton_id = $1
              AND p.sku_code = $2
              AND p.scanned > 0
              AND c.status NOT IN ('COMPLETED', 'CANCELED')
            RETURNING p.carton_id, p.sku_code, p.expected, p.scanned
            "#,
        )
        .bind(carton_id.as_str())
        .bind(sku.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if let Some(row) = updated {
            let line = row.into_line().map_err(AppError::database)?;
            return Ok(ReleaseOutcome::Released(line));
        }

        // 未更新时区分原因
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM cartons WHERE carton_id = $1")
                .bind(carton_id.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;
        if let Some(status) = status {
            let status: CartonStatus = status
                .parse()
                .map_err(|e| AppError::database(format!("{}", e)))?;
            if status.is_terminal() {
                return Ok(ReleaseOutcome::Locked(status));
            }
        }

        let scanned: Option<i32> = sqlx::query_scalar(
            "SELECT scanned FROM carton_sku_plans WHERE carton_id = $1 AND sku_code = $2",
        )
        .bind(carton_id.as_str())
        .bind(sku.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        match scanned {
            Some(_) => Ok(ReleaseOutcome::NothingToRelease),
            None => Ok(ReleaseOutcome::NotPlanned),
        }
    }
}

// =============================================================================
// ScanRepository 实现
// =============================================================================

#[async_trait]
impl ScanRepository for TxScanRepository {
    async fn find_by_id(&self, id: &ScanId) -> AppResult<Option<Scan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!("SELECT {} FROM scans WHERE scan_id = $1", SCAN_COLUMNS);
        let row = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_scan().map_err(AppError::database))
            .transpose()
    }

    async fn find_by_carton_and_token(
        &self,
        carton_id: &CartonId,
        qr_token: &QrToken,
    ) -> AppResult<Option<Scan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM scans WHERE carton_id = $1 AND qr_token = $2",
            SCAN_COLUMNS
        );
        let row = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(carton_id.as_str())
            .bind(qr_token.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_scan().map_err(AppError::database))
            .transpose()
    }

    async fn insert(&self, scan: &Scan) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        sqlx::query(
            r#"
            INSERT INTO scans (scan_id, carton_id, sku_code, qr_token, upc, status,
                               operator, device, source_box_id, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(scan.id.0)
        .bind(scan.carton_id.as_str())
        .bind(scan.sku.as_str())
        .bind(scan.qr_token.as_str())
        .bind(scan.upc.as_str())
        .bind(scan.status.as_str())
        .bind(&scan.operator)
        .bind(&scan.device)
        .bind(scan.source_box.map(|b| b.0))
        .bind(scan.scanned_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &ScanId) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let result = sqlx::query("DELETE FROM scans WHERE scan_id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<Scan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM scans WHERE carton_id = $1 ORDER BY scanned_at, scan_id",
            SCAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, ScanRow>(&sql)
            .bind(carton_id.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|r| r.into_scan().map_err(AppError::database))
            .collect()
    }

    async fn statistics(&self) -> AppResult<ScanStatistics> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let row = sqlx::query_as::<_, ScanStatisticsRow>(
            r#"
            SELECT
                COUNT(DISTINCT carton_id) AS total_cartons,
                COUNT(*) AS total_scans,
                COUNT(DISTINCT sku_code) AS distinct_skus,
                COUNT(*) FILTER (WHERE status = 'VALIDATED') AS validated,
                COUNT(*) FILTER (WHERE status = 'DUPLICATE') AS duplicate,
                COUNT(*) FILTER (WHERE status = 'SKU_MISMATCH') AS sku_mismatch,
                COUNT(*) FILTER (WHERE status = 'ERROR') AS error
            FROM scans
            "#,
        )
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.into_statistics())
    }
}

// =============================================================================
// BoxRepository 实现
// =============================================================================

impl TxBoxRepository {
    async fn select_one(
        &self,
        filter: &str,
        bind: BoxKey<'_>,
        for_update: bool,
    ) -> AppResult<Option<PackedBox>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM boxes WHERE {}{}",
            BOX_COLUMNS,
            filter,
            if for_update { " FOR UPDATE" } else { "" }
        );
        let query = sqlx::query_as::<_, BoxRow>(&sql);
        let query = match bind {
            BoxKey::Id(id) => query.bind(id.0),
            BoxKey::Code(code) => query.bind(code.trim().to_string()),
        };
        let row = query
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_box().map_err(AppError::database))
            .transpose()
    }
}

enum BoxKey<'a> {
    Id(&'a BoxId),
    Code(&'a str),
}

#[async_trait]
impl BoxRepository for TxBoxRepository {
    async fn find_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>> {
        self.select_one("box_id = $1", BoxKey::Id(id), false).await
    }

    async fn find_by_code(&self, code: &str) -> AppResult<Option<PackedBox>> {
        self.select_one("box_code = $1", BoxKey::Code(code), false)
            .await
    }

    async fn lock_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>> {
        self.select_one("box_id = $1", BoxKey::Id(id), true).await
    }

    async fn lock_by_code(&self, code: &str) -> AppResult<Option<PackedBox>> {
        self.select_one("box_code = $1", BoxKey::Code(code), true)
            .await
    }

    async fn insert(&self, packed_box: &PackedBox) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        sqlx::query(
            r#"
            INSERT INTO boxes (box_id, box_code, box_date, sku_code, expected_units, sequence,
                               carton_id, validated, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(packed_box.id.0)
        .bind(&packed_box.code)
        .bind(packed_box.descriptor.date)
        .bind(packed_box.descriptor.sku.as_str())
        .bind(to_i32(packed_box.descriptor.expected_units, "expected_units")?)
        .bind(to_i32(packed_box.descriptor.sequence, "sequence")?)
        .bind(packed_box.carton_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(packed_box.validated)
        .bind(packed_box.status.as_str())
        .bind(packed_box.created_at)
        .bind(packed_box.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn update(&self, packed_box: &PackedBox) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let result = sqlx::query(
            r#"
            UPDATE boxes
            SET carton_id = $2, validated = $3, status = $4, updated_at = $5
            WHERE box_id = $1
            "#,
        )
        .bind(packed_box.id.0)
        .bind(packed_box.carton_id.as_ref().map(|c| c.as_str().to_string()))
        .bind(packed_box.validated)
        .bind(packed_box.status.as_str())
        .bind(packed_box.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("box {}", packed_box.id)));
        }
        Ok(())
    }

    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<PackedBox>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM boxes WHERE carton_id = $1 ORDER BY created_at, box_code",
            BOX_COLUMNS
        );
        let rows = sqlx::query_as::<_, BoxRow>(&sql)
            .bind(carton_id.as_str())
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|r| r.into_box().map_err(AppError::database))
            .collect()
    }
}

// =============================================================================
// BoxScanRepository 实现
// =============================================================================

#[async_trait]
impl BoxScanRepository for TxBoxScanRepository {
    async fn find_by_id(&self, id: &BoxScanId) -> AppResult<Option<BoxScan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM box_scans WHERE box_scan_id = $1",
            BOX_SCAN_COLUMNS
        );
        let row = sqlx::query_as::<_, BoxScanRow>(&sql)
            .bind(id.0)
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_box_scan().map_err(AppError::database))
            .transpose()
    }

    async fn find_by_box_and_token(
        &self,
        box_id: &BoxId,
        qr_token: &QrToken,
    ) -> AppResult<Option<BoxScan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM box_scans WHERE box_id = $1 AND qr_token = $2",
            BOX_SCAN_COLUMNS
        );
        let row = sqlx::query_as::<_, BoxScanRow>(&sql)
            .bind(box_id.0)
            .bind(qr_token.as_str())
            .fetch_optional(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        row.map(|r| r.into_box_scan().map_err(AppError::database))
            .transpose()
    }

    async fn insert(&self, scan: &BoxScan) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        sqlx::query(
            r#"
            INSERT INTO box_scans (box_scan_id, box_id, qr_token, upc, sku_code, status,
                                   operator, device, scanned_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(scan.id.0)
        .bind(scan.box_id.0)
        .bind(scan.qr_token.as_str())
        .bind(scan.upc.as_str())
        .bind(scan.sku.as_str())
        .bind(scan.status.as_str())
        .bind(&scan.operator)
        .bind(&scan.device)
        .bind(scan.scanned_at)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn delete(&self, id: &BoxScanId) -> AppResult<bool> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let result = sqlx::query("DELETE FROM box_scans WHERE box_scan_id = $1")
            .bind(id.0)
            .execute(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_by_box(&self, box_id: &BoxId) -> AppResult<Vec<BoxScan>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sql = format!(
            "SELECT {} FROM box_scans WHERE box_id = $1 ORDER BY scanned_at, box_scan_id",
            BOX_SCAN_COLUMNS
        );
        let rows = sqlx::query_as::<_, BoxScanRow>(&sql)
            .bind(box_id.0)
            .fetch_all(&mut **tx)
            .await
            .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|r| r.into_box_scan().map_err(AppError::database))
            .collect()
    }

    async fn count_matching(&self, box_id: &BoxId) -> AppResult<u32> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM box_scans WHERE box_id = $1 AND status = 'VALIDATED'",
        )
        .bind(box_id.0)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        u32::try_from(count).map_err(|_| AppError::database(format!("bad count {}", count)))
    }
}

// =============================================================================
// CatalogRepository / MasterDataRepository 实现
// =============================================================================

#[async_trait]
impl CatalogRepository for TxCatalogRepository {
    async fn latest_record(&self, qr_token: &QrToken) -> AppResult<Option<CatalogRecord>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let row = sqlx::query_as::<_, CatalogRecordRow>(
            r#"
            SELECT qr_token, upc, source, metadata, synced_at
            FROM catalog_records
            WHERE qr_token = $1
            ORDER BY synced_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(qr_token.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CatalogRecordRow::into_record))
    }

    async fn sku_for_upc(&self, upc: &Upc) -> AppResult<Option<SkuCode>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let sku: Option<String> =
            sqlx::query_scalar("SELECT sku_code FROM upc_mappings WHERE upc = $1")
                .bind(upc.as_str())
                .fetch_optional(&mut **tx)
                .await
                .map_err(map_sqlx_error)?;

        Ok(sku.map(SkuCode::from))
    }
}

#[async_trait]
impl MasterDataRepository for TxMasterDataRepository {
    async fn find_purchase_order(&self, number: &PoNumber) -> AppResult<Option<PurchaseOrder>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let row = sqlx::query_as::<_, PurchaseOrderRow>(
            "SELECT po_number, supplier, status, notes FROM purchase_orders WHERE po_number = $1",
        )
        .bind(number.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PurchaseOrderRow::into_purchase_order))
    }

    async fn find_sku(&self, code: &SkuCode) -> AppResult<Option<Sku>> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;

        let row = sqlx::query_as::<_, SkuRow>(
            "SELECT sku_code, description, color, category, size FROM skus WHERE sku_code = $1",
        )
        .bind(code.as_str())
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SkuRow::into_sku))
    }
}
