//! 复用箱校验
//!
//! 已校验箱子内 SKU 一致的扫描逐件走装箱接收流程，每件一个保存点，
//! 单件被拒绝只回滚该件。

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::admission::admit_resolved;
use super::commands::ReuseValidationCommand;
use super::finish;
use crate::domain::entities::{BoxScan, Carton, PackedBox};
use crate::domain::services::Resolution;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{BoxId, CartonId, QrToken, ScanContext, ScanId, SkuCode};
use crate::error::{ScanError, ScanResult};
use crate::infrastructure::metrics;

/// 单件处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReuseItemOutcome {
    Created { scan_id: ScanId },
    Rejected { code: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReuseItemResult {
    pub qr_token: QrToken,
    pub sku: SkuCode,
    pub outcome: ReuseItemOutcome,
}

impl ReuseItemResult {
    pub fn is_created(&self) -> bool {
        matches!(self.outcome, ReuseItemOutcome::Created { .. })
    }
}

/// 复用结果
#[derive(Debug, Clone, Serialize)]
pub struct ReuseOutcome {
    pub source_box: BoxId,
    pub target_carton: CartonId,
    pub scans_created: usize,
    /// 按箱内扫描时间顺序
    pub results: Vec<ReuseItemResult>,
}

impl ReuseOutcome {
    pub fn rejected(&self) -> impl Iterator<Item = &ReuseItemResult> {
        self.results.iter().filter(|r| !r.is_created())
    }
}

pub struct ValidationReuseEngine {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl ValidationReuseEngine {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// 一件都没有生成时整体回滚并返回 NothingReusable
    pub async fn reuse(&self, cmd: ReuseValidationCommand) -> ScanResult<ReuseOutcome> {
        cmd.validate()?;

        let uow = self.uow_factory.begin().await?;
        let result = reuse_in(uow.as_ref(), &cmd).await;
        let result = finish(uow, result).await;

        match &result {
            Ok(outcome) => {
                let rejected = outcome.results.len() - outcome.scans_created;
                metrics::record_reuse(outcome.scans_created, rejected);
                info!(
                    source_box = %outcome.source_box,
                    target_carton = %outcome.target_carton,
                    created = outcome.scans_created,
                    rejected,
                    "Box validation reused"
                );
            }
            Err(e) => {
                metrics::record_reuse(0, 0);
                warn!(
                    source_box = %cmd.source_box,
                    target_carton = %cmd.target_carton,
                    error = %e,
                    "Box validation reuse failed"
                );
            }
        }
        result
    }
}

async fn load_source_box(uow: &dyn UnitOfWork, box_id: &BoxId) -> ScanResult<PackedBox> {
    let packed_box = uow
        .boxes()
        .lock_by_id(box_id)
        .await?
        .ok_or_else(|| ScanError::not_found("box", box_id))?;
    if !packed_box.is_reusable() {
        return Err(ScanError::invalid_state(format!(
            "box {} is not fully validated",
            packed_box.code
        )));
    }
    Ok(packed_box)
}

async fn load_target_carton(uow: &dyn UnitOfWork, carton_id: &CartonId) -> ScanResult<Carton> {
    let carton = uow
        .cartons()
        .lock_by_id(carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", carton_id))?;
    carton.ensure_accepting_scans()?;
    Ok(carton)
}

async fn reuse_in(uow: &dyn UnitOfWork, cmd: &ReuseValidationCommand) -> ScanResult<ReuseOutcome> {
    let packed_box = load_source_box(uow, &cmd.source_box).await?;
    let carton = load_target_carton(uow, &cmd.target_carton).await?;

    let matching: Vec<BoxScan> = uow
        .box_scans()
        .list_by_box(&packed_box.id)
        .await?
        .into_iter()
        .filter(BoxScan::is_match)
        .collect();

    if matching.is_empty() {
        return Err(ScanError::NothingReusable {
            reason: format!("box {} has no SKU-matching scans", packed_box.code),
        });
    }

    let mut results = Vec::with_capacity(matching.len());
    for (index, box_scan) in matching.iter().enumerate() {
        let outcome = reuse_one(uow, &carton, &packed_box, box_scan, &cmd.context, index).await?;
        results.push(ReuseItemResult {
            qr_token: box_scan.qr_token.clone(),
            sku: box_scan.sku.clone(),
            outcome,
        });
    }

    let scans_created = results.iter().filter(|r| r.is_created()).count();
    if scans_created == 0 {
        let reason = results
            .iter()
            .find_map(|r| match &r.outcome {
                ReuseItemOutcome::Rejected { message, .. } => Some(message.clone()),
                ReuseItemOutcome::Created { .. } => None,
            })
            .unwrap_or_else(|| "no scans could be admitted".to_string());
        return Err(ScanError::NothingReusable { reason });
    }

    Ok(ReuseOutcome {
        source_box: packed_box.id,
        target_carton: carton.id,
        scans_created,
        results,
    })
}

/// 单件在自己的保存点内接收，业务拒绝回滚到保存点，基础设施错误向上抛出
async fn reuse_one(
    uow: &dyn UnitOfWork,
    carton: &Carton,
    packed_box: &PackedBox,
    box_scan: &BoxScan,
    context: &ScanContext,
    index: usize,
) -> ScanResult<ReuseItemOutcome> {
    let savepoint = format!("reuse_item_{}", index);
    uow.savepoint(&savepoint).await?;

    let resolution = Resolution {
        qr_token: box_scan.qr_token.clone(),
        upc: box_scan.upc.clone(),
        sku: box_scan.sku.clone(),
    };

    match admit_resolved(uow, carton, &resolution, context, Some(packed_box.id)).await {
        Ok(scan) => {
            uow.release_savepoint(&savepoint).await?;
            Ok(ReuseItemOutcome::Created { scan_id: scan.id })
        }
        Err(e) if e.is_item_rejection() => {
            uow.rollback_to_savepoint(&savepoint).await?;
            uow.release_savepoint(&savepoint).await?;
            debug!(qr_token = %box_scan.qr_token, code = e.code(), "Reuse item rejected");
            Ok(ReuseItemOutcome::Rejected {
                code: e.code().to_string(),
                message: e.to_string(),
            })
        }
        Err(e) => Err(e),
    }
}
