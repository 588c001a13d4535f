//! 查询
//!
//! 只读操作同样开启工作单元，读完即回滚

use std::sync::Arc;

use serde::Serialize;

use super::commands::BoxRef;
use crate::domain::entities::{BoxScan, Carton, PackedBox, Scan, Sku};
use crate::domain::repositories::ScanStatistics;
use crate::domain::services::{CatalogResolver, Resolution};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{BoxDescriptor, CartonId, QrToken, SkuCode};
use crate::error::{ScanError, ScanResult};

/// 单个 SKU 的进度
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkuProgress {
    pub sku: SkuCode,
    pub expected: u32,
    pub scanned: u32,
    pub remaining: u32,
}

/// 装箱进度
#[derive(Debug, Clone, Serialize)]
pub struct CartonProgress {
    pub carton: Carton,
    pub lines: Vec<SkuProgress>,
    pub total_expected: u32,
    /// 由各计划行已扫数量汇总
    pub total_scanned: u32,
}

impl CartonProgress {
    pub fn line(&self, sku: &str) -> Option<&SkuProgress> {
        self.lines.iter().find(|l| l.sku.as_str() == sku)
    }

    /// 0.0 - 100.0
    pub fn percent(&self) -> f64 {
        if self.total_expected == 0 {
            return 0.0;
        }
        f64::from(self.total_scanned) * 100.0 / f64::from(self.total_expected)
    }

    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|l| l.remaining == 0)
    }
}

/// 箱子进度
#[derive(Debug, Clone, Serialize)]
pub struct BoxProgress {
    pub packed_box: PackedBox,
    pub matching_units: u32,
    pub mismatched_units: u32,
    pub scans: Vec<BoxScan>,
}

/// 复用可行性
#[derive(Debug, Clone, Serialize)]
pub struct ReuseEligibility {
    pub packed_box: PackedBox,
    pub reusable: bool,
    pub reason: String,
    pub matching_units: u32,
}

/// 二维码预览
#[derive(Debug, Clone, Serialize)]
pub struct QrPreview {
    pub resolution: Resolution,
    pub bare_code: String,
    pub sku: Option<Sku>,
}

pub struct ReconQueries {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl ReconQueries {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    pub async fn carton_progress(&self, carton_id: &CartonId) -> ScanResult<CartonProgress> {
        let uow = self.uow_factory.begin().await?;
        let result = carton_progress_in(uow.as_ref(), carton_id).await;
        uow.rollback().await?;
        result
    }

    pub async fn list_scans(&self, carton_id: &CartonId) -> ScanResult<Vec<Scan>> {
        let uow = self.uow_factory.begin().await?;
        let result = list_scans_in(uow.as_ref(), carton_id).await;
        uow.rollback().await?;
        result
    }

    pub async fn box_progress(&self, target: &BoxRef) -> ScanResult<BoxProgress> {
        let uow = self.uow_factory.begin().await?;
        let result = box_progress_in(uow.as_ref(), target).await;
        uow.rollback().await?;
        result
    }

    /// 箱码未登记时返回 NotFound
    pub async fn check_reusable(&self, code: &str) -> ScanResult<ReuseEligibility> {
        let uow = self.uow_factory.begin().await?;
        let result = check_reusable_in(uow.as_ref(), code).await;
        uow.rollback().await?;
        result
    }

    /// 归属于该装箱的箱子
    pub async fn boxes_for_carton(&self, carton_id: &CartonId) -> ScanResult<Vec<PackedBox>> {
        let uow = self.uow_factory.begin().await?;
        let result = boxes_for_carton_in(uow.as_ref(), carton_id).await;
        uow.rollback().await?;
        result
    }

    /// 全部装箱扫描按状态汇总
    pub async fn scan_statistics(&self) -> ScanResult<ScanStatistics> {
        let uow = self.uow_factory.begin().await?;
        let result = uow.scans().statistics().await.map_err(Into::into);
        uow.rollback().await?;
        result
    }

    pub async fn preview_qr(&self, qr_token: &QrToken) -> ScanResult<QrPreview> {
        let uow = self.uow_factory.begin().await?;
        let result = preview_qr_in(uow.as_ref(), qr_token).await;
        uow.rollback().await?;
        result
    }

    /// 纯解析，不访问存储
    pub fn parse_box_code(code: &str) -> ScanResult<BoxDescriptor> {
        BoxDescriptor::parse(code)
    }
}

async fn carton_progress_in(
    uow: &dyn UnitOfWork,
    carton_id: &CartonId,
) -> ScanResult<CartonProgress> {
    let carton = uow
        .cartons()
        .find_by_id(carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", carton_id))?;

    let lines: Vec<SkuProgress> = uow
        .ledger()
        .plan_lines(carton_id)
        .await?
        .into_iter()
        .map(|l| SkuProgress {
            remaining: l.remaining(),
            sku: l.sku,
            expected: l.expected,
            scanned: l.scanned,
        })
        .collect();
    let total_scanned = lines.iter().map(|l| l.scanned).sum();

    Ok(CartonProgress {
        total_expected: carton.total_expected,
        carton,
        lines,
        total_scanned,
    })
}

async fn list_scans_in(uow: &dyn UnitOfWork, carton_id: &CartonId) -> ScanResult<Vec<Scan>> {
    if uow.cartons().find_by_id(carton_id).await?.is_none() {
        return Err(ScanError::not_found("carton", carton_id));
    }
    Ok(uow.scans().list_by_carton(carton_id).await?)
}

async fn boxes_for_carton_in(
    uow: &dyn UnitOfWork,
    carton_id: &CartonId,
) -> ScanResult<Vec<PackedBox>> {
    if uow.cartons().find_by_id(carton_id).await?.is_none() {
        return Err(ScanError::not_found("carton", carton_id));
    }
    Ok(uow.boxes().list_by_carton(carton_id).await?)
}

async fn preview_qr_in(uow: &dyn UnitOfWork, qr_token: &QrToken) -> ScanResult<QrPreview> {
    let resolution = CatalogResolver::new(uow.catalog())
        .resolve(qr_token)
        .await?;
    let sku = uow.master_data().find_sku(&resolution.sku).await?;
    Ok(QrPreview {
        bare_code: qr_token.bare_code().to_string(),
        resolution,
        sku,
    })
}

async fn box_progress_in(uow: &dyn UnitOfWork, target: &BoxRef) -> ScanResult<BoxProgress> {
    let packed_box = match target {
        BoxRef::Id(id) => uow.boxes().find_by_id(id).await?,
        BoxRef::Code(code) => uow.boxes().find_by_code(code.trim()).await?,
    }
    .ok_or_else(|| ScanError::not_found("box", target.describe()))?;

    let scans = uow.box_scans().list_by_box(&packed_box.id).await?;
    let matching_units = scans.iter().filter(|s| s.is_match()).count() as u32;
    let mismatched_units = scans.len() as u32 - matching_units;

    Ok(BoxProgress {
        packed_box,
        matching_units,
        mismatched_units,
        scans,
    })
}

async fn check_reusable_in(uow: &dyn UnitOfWork, code: &str) -> ScanResult<ReuseEligibility> {
    let code = code.trim();
    let packed_box = uow
        .boxes()
        .find_by_code(code)
        .await?
        .ok_or_else(|| ScanError::not_found("box", code))?;

    let matching_units = uow.box_scans().count_matching(&packed_box.id).await?;
    let (reusable, reason) = if !packed_box.is_reusable() {
        (
            false,
            format!(
                "box is not fully validated ({}/{})",
                matching_units,
                packed_box.expected_units()
            ),
        )
    } else if matching_units == 0 {
        (false, "box has no SKU-matching scans".to_string())
    } else {
        (true, format!("{} matching scans can be reused", matching_units))
    };

    Ok(ReuseEligibility {
        packed_box,
        reusable,
        reason,
        matching_units,
    })
}
