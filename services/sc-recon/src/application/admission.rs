//! 扫描接收
//!
//! 装箱扫描与箱内扫描的检查顺序固定，任何一步失败整个事务回滚

use std::sync::Arc;

use recon_errors::AppError;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::commands::{AdmitBoxScanCommand, AdmitScanCommand, BoxRef};
use super::finish;
use crate::domain::entities::{BoxScan, Carton, PackedBox, Scan};
use crate::domain::repositories::BoxRepository;
use crate::domain::services::{CatalogResolver, QuantityLedger, Resolution};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{BoxId, BoxScanId, ScanContext, ScanId};
use crate::error::{ScanError, ScanResult};
use crate::infrastructure::metrics;

/// 箱内扫描结果
#[derive(Debug, Clone, Serialize)]
pub struct BoxScanOutcome {
    pub scan: BoxScan,
    pub matching_units: u32,
    pub expected_units: u32,
    /// 本次扫描后箱子是否已校验
    pub box_validated: bool,
}

pub struct ScanAdmissionEngine {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl ScanAdmissionEngine {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// 扫描一件商品进装箱
    pub async fn admit(&self, cmd: AdmitScanCommand) -> ScanResult<Scan> {
        cmd.validate()?;

        let uow = self.uow_factory.begin().await?;
        let result = admit_in(uow.as_ref(), &cmd).await;
        let result = finish(uow, result).await;

        match &result {
            Ok(scan) => {
                metrics::record_carton_scan("accepted");
                info!(
                    carton_id = %scan.carton_id,
                    sku = %scan.sku,
                    qr_token = %scan.qr_token,
                    operator = %scan.operator,
                    "Scan admitted"
                );
            }
            Err(e) => {
                metrics::record_carton_scan(e.code());
                debug!(carton_id = %cmd.carton_id, qr_token = %cmd.qr_token, error = %e, "Scan rejected");
            }
        }
        result
    }

    /// 扫描一件商品进箱子
    ///
    /// SKU 不符的扫描也会记录，但不计入箱子的匹配件数
    pub async fn admit_to_box(&self, cmd: AdmitBoxScanCommand) -> ScanResult<BoxScanOutcome> {
        cmd.validate()?;

        let uow = self.uow_factory.begin().await?;
        let result = admit_to_box_in(uow.as_ref(), &cmd).await;
        let result = finish(uow, result).await;

        match &result {
            Ok(outcome) => {
                metrics::record_box_scan(outcome.scan.status.as_str());
                if outcome.box_validated {
                    metrics::record_box_validated();
                }
                info!(
                    box_id = %outcome.scan.box_id,
                    qr_token = %outcome.scan.qr_token,
                    status = %outcome.scan.status,
                    matching = outcome.matching_units,
                    expected = outcome.expected_units,
                    "Box scan recorded"
                );
            }
            Err(e) => {
                metrics::record_box_scan(e.code());
                debug!(target_box = %cmd.target.describe(), error = %e, "Box scan rejected");
            }
        }
        result
    }

    /// 删除装箱扫描，已计数的扫描同时归还台账
    pub async fn delete_scan(&self, scan_id: ScanId) -> ScanResult<()> {
        let uow = self.uow_factory.begin().await?;
        let result = delete_scan_in(uow.as_ref(), scan_id).await;
        let result = finish(uow, result).await;
        if result.is_ok() {
            info!(scan_id = %scan_id, "Scan deleted");
        }
        result
    }

    /// 删除箱内扫描，已校验的箱子不可修改
    pub async fn delete_box_scan(&self, box_scan_id: BoxScanId) -> ScanResult<()> {
        let uow = self.uow_factory.begin().await?;
        let result = delete_box_scan_in(uow.as_ref(), box_scan_id).await;
        let result = finish(uow, result).await;
        if result.is_ok() {
            info!(box_scan_id = %box_scan_id, "Box scan deleted");
        }
        result
    }
}

async fn admit_in(uow: &dyn UnitOfWork, cmd: &AdmitScanCommand) -> ScanResult<Scan> {
    let carton = uow
        .cartons()
        .lock_by_id(&cmd.carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", &cmd.carton_id))?;
    carton.ensure_accepting_scans()?;

    let resolution = CatalogResolver::new(uow.catalog())
        .resolve(&cmd.qr_token)
        .await?;

    admit_resolved(uow, &carton, &resolution, &cmd.context, None).await
}

/// 计划校验、预占、查重、落库
///
/// 调用方已锁定并校验装箱。返回错误时调用方必须回滚事务或保存点，
/// 唯一约束兜底路径的预占依靠回滚撤销。
pub(crate) async fn admit_resolved(
    uow: &dyn UnitOfWork,
    carton: &Carton,
    resolution: &Resolution,
    context: &ScanContext,
    source_box: Option<BoxId>,
) -> ScanResult<Scan> {
    if uow
        .ledger()
        .find_line(&carton.id, &resolution.sku)
        .await?
        .is_none()
    {
        return Err(ScanError::SkuNotExpected {
            carton_id: carton.id.to_string(),
            sku: resolution.sku.to_string(),
        });
    }

    let ledger = QuantityLedger::new(uow.ledger());
    ledger.reserve_one(&carton.id, &resolution.sku).await?;

    if uow
        .scans()
        .find_by_carton_and_token(&carton.id, &resolution.qr_token)
        .await?
        .is_some()
    {
        ledger.release_one(&carton.id, &resolution.sku).await?;
        return Err(duplicate_in_carton(carton, resolution));
    }

    let mut scan = Scan::validated(
        carton.id.clone(),
        resolution.sku.clone(),
        resolution.qr_token.clone(),
        resolution.upc.clone(),
        context,
    );
    if let Some(source) = source_box {
        scan = scan.from_box(source);
    }

    match uow.scans().insert(&scan).await {
        Ok(()) => Ok(scan),
        Err(AppError::Conflict(_)) => Err(duplicate_in_carton(carton, resolution)),
        Err(e) => Err(e.into()),
    }
}

fn duplicate_in_carton(carton: &Carton, resolution: &Resolution) -> ScanError {
    ScanError::DuplicateScan {
        qr_token: resolution.qr_token.to_string(),
        scope: format!("carton {}", carton.id),
    }
}

/// 按 ID 或箱码锁定箱子
pub(crate) async fn lock_box(boxes: &dyn BoxRepository, target: &BoxRef) -> ScanResult<PackedBox> {
    let found = match target {
        BoxRef::Id(id) => boxes.lock_by_id(id).await?,
        BoxRef::Code(code) => boxes.lock_by_code(code.trim()).await?,
    };
    found.ok_or_else(|| ScanError::not_found("box", target.describe()))
}

async fn admit_to_box_in(
    uow: &dyn UnitOfWork,
    cmd: &AdmitBoxScanCommand,
) -> ScanResult<BoxScanOutcome> {
    let mut packed_box = lock_box(uow.boxes(), &cmd.target).await?;
    packed_box.ensure_accepting_scans()?;

    if let Some(carton_id) = &packed_box.carton_id {
        if let Some(carton) = uow.cartons().find_by_id(carton_id).await? {
            carton.ensure_accepting_scans()?;
        }
    }

    let resolution = CatalogResolver::new(uow.catalog())
        .resolve(&cmd.qr_token)
        .await?;

    if let Some(label_upc) = &cmd.upc {
        if label_upc != &resolution.upc {
            return Err(ScanError::UpcMismatch {
                expected: resolution.upc.to_string(),
                received: label_upc.to_string(),
            });
        }
    }

    let duplicate = || ScanError::DuplicateScan {
        qr_token: resolution.qr_token.to_string(),
        scope: format!("box {}", packed_box.code),
    };

    if uow
        .box_scans()
        .find_by_box_and_token(&packed_box.id, &resolution.qr_token)
        .await?
        .is_some()
    {
        return Err(duplicate());
    }

    let scan = BoxScan::record(
        &packed_box,
        resolution.qr_token.clone(),
        resolution.upc.clone(),
        resolution.sku.clone(),
        &cmd.context,
    );
    match uow.box_scans().insert(&scan).await {
        Ok(()) => {}
        Err(AppError::Conflict(_)) => return Err(duplicate()),
        Err(e) => return Err(e.into()),
    }

    let matching_units = uow.box_scans().count_matching(&packed_box.id).await?;
    if packed_box.mark_validated_if_complete(matching_units) {
        uow.boxes().update(&packed_box).await?;
        info!(box_id = %packed_box.id, code = %packed_box.code, "Box fully validated");
    }

    Ok(BoxScanOutcome {
        scan,
        matching_units,
        expected_units: packed_box.expected_units(),
        box_validated: packed_box.validated,
    })
}

async fn delete_scan_in(uow: &dyn UnitOfWork, scan_id: ScanId) -> ScanResult<()> {
    let scan = uow
        .scans()
        .find_by_id(&scan_id)
        .await?
        .ok_or_else(|| ScanError::not_found("scan", scan_id))?;

    let carton = uow
        .cartons()
        .lock_by_id(&scan.carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", &scan.carton_id))?;
    if carton.status.is_terminal() {
        return Err(ScanError::LockedState(format!(
            "carton {} is {}, its scans cannot be deleted",
            carton.id, carton.status
        )));
    }

    if scan.counts_toward_plan() {
        QuantityLedger::new(uow.ledger())
            .release_one(&scan.carton_id, &scan.sku)
            .await?;
    }

    if !uow.scans().delete(&scan_id).await? {
        warn!(scan_id = %scan_id, "Scan vanished before delete");
        return Err(ScanError::not_found("scan", scan_id));
    }
    Ok(())
}

async fn delete_box_scan_in(uow: &dyn UnitOfWork, box_scan_id: BoxScanId) -> ScanResult<()> {
    let scan = uow
        .box_scans()
        .find_by_id(&box_scan_id)
        .await?
        .ok_or_else(|| ScanError::not_found("box scan", box_scan_id))?;

    let packed_box = lock_box(uow.boxes(), &BoxRef::Id(scan.box_id)).await?;
    if packed_box.validated {
        return Err(ScanError::LockedState(format!(
            "box {} is validated, its scans cannot be deleted",
            packed_box.code
        )));
    }

    if !uow.box_scans().delete(&box_scan_id).await? {
        return Err(ScanError::not_found("box scan", box_scan_id));
    }
    Ok(())
}
