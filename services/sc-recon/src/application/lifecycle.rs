//! 装箱生命周期：创建、开始、结箱
//!
//! 结箱时持有装箱行锁调用外部出货系统，只有外部成功才写入终态，
//! 失败整体回滚，装箱保持进行中以便重试。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use recon_errors::AppError;
use serde::Serialize;
use tracing::{error, info};

use super::commands::{CreateCartonCommand, FinalizeCartonCommand};
use super::finish;
use crate::domain::entities::{Carton, Scan, Sku, SkuPlanLine};
use crate::domain::enums::{CartonStatus, FinalizeDecision};
use crate::domain::services::{
    ShipmentGateway, ShipmentReceipt, build_cancel_codes, build_confirm_batch,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{CartonId, SkuCode};
use crate::error::{ScanError, ScanResult};
use crate::infrastructure::metrics;

/// 结箱参数
#[derive(Debug, Clone)]
pub struct LifecycleSettings {
    /// SKU 缺少尺码时上报的默认值
    pub default_size: String,
    /// 外部调用的总超时
    pub shipment_timeout: Duration,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            default_size: "M".to_string(),
            shipment_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&recon_config::ShipmentConfig> for LifecycleSettings {
    fn from(config: &recon_config::ShipmentConfig) -> Self {
        Self {
            default_size: config.default_size.clone(),
            shipment_timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

/// 结箱结果
#[derive(Debug, Clone, Serialize)]
pub struct FinalizeOutcome {
    pub carton_id: CartonId,
    pub decision: FinalizeDecision,
    pub status: CartonStatus,
    /// 上报的件数
    pub units_submitted: usize,
    pub receipt: ShipmentReceipt,
}

pub struct LifecycleController {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
    shipment: Arc<dyn ShipmentGateway>,
    settings: LifecycleSettings,
}

impl LifecycleController {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        shipment: Arc<dyn ShipmentGateway>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            uow_factory,
            shipment,
            settings,
        }
    }

    /// 创建装箱及其计划，初始状态 PENDING
    pub async fn create_carton(&self, cmd: CreateCartonCommand) -> ScanResult<Carton> {
        cmd.validate()?;
        info!(carton_id = %cmd.carton_id, po = %cmd.po_number, lines = cmd.lines.len(), "Creating carton");

        let uow = self.uow_factory.begin().await?;
        let result = create_in(uow.as_ref(), &cmd).await;
        finish(uow, result).await
    }

    /// PENDING → IN_PROGRESS
    pub async fn start(&self, carton_id: &CartonId) -> ScanResult<Carton> {
        let uow = self.uow_factory.begin().await?;
        let result = start_in(uow.as_ref(), carton_id).await;
        let result = finish(uow, result).await;
        if result.is_ok() {
            info!(carton_id = %carton_id, "Carton started");
        }
        result
    }

    /// 确认或取消装箱
    pub async fn finalize(&self, cmd: FinalizeCartonCommand) -> ScanResult<FinalizeOutcome> {
        let uow = self.uow_factory.begin().await?;
        let result = self.finalize_in(uow.as_ref(), &cmd).await;
        let result = finish(uow, result).await;

        match &result {
            Ok(outcome) => info!(
                carton_id = %outcome.carton_id,
                decision = %outcome.decision,
                units = outcome.units_submitted,
                "Carton finalized"
            ),
            Err(e) => error!(
                carton_id = %cmd.carton_id,
                decision = %cmd.decision,
                error = %e,
                "Carton finalize failed"
            ),
        }
        result
    }

    async fn finalize_in(
        &self,
        uow: &dyn UnitOfWork,
        cmd: &FinalizeCartonCommand,
    ) -> ScanResult<FinalizeOutcome> {
        let mut carton = uow
            .cartons()
            .lock_by_id(&cmd.carton_id)
            .await?
            .ok_or_else(|| ScanError::not_found("carton", &cmd.carton_id))?;

        if carton.status != CartonStatus::InProgress {
            return Err(ScanError::invalid_state(format!(
                "carton {} is {}, only IN_PROGRESS cartons can be finalized",
                carton.id, carton.status
            )));
        }

        let scans: Vec<Scan> = uow
            .scans()
            .list_by_carton(&carton.id)
            .await?
            .into_iter()
            .filter(Scan::counts_toward_plan)
            .collect();
        if scans.is_empty() {
            return Err(ScanError::invalid_state(format!(
                "carton {} has no validated scans",
                carton.id
            )));
        }

        let started = Instant::now();
        let submitted = self.submit(uow, &carton, &scans, cmd.decision).await;
        metrics::record_finalize(cmd.decision.as_str(), submitted.is_ok(), started.elapsed());
        let receipt = submitted?;

        let target = cmd.decision.target_status();
        carton.transition_to(target)?;
        uow.cartons().update_status(&carton.id, target).await?;

        Ok(FinalizeOutcome {
            carton_id: carton.id,
            decision: cmd.decision,
            status: target,
            units_submitted: scans.len(),
            receipt,
        })
    }

    /// 在超时内调用外部系统
    async fn submit(
        &self,
        uow: &dyn UnitOfWork,
        carton: &Carton,
        scans: &[Scan],
        decision: FinalizeDecision,
    ) -> ScanResult<ShipmentReceipt> {
        let call = self.call_shipment(uow, carton, scans, decision);
        match tokio::time::timeout(self.settings.shipment_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ScanError::External {
                message: format!(
                    "shipment service did not answer within {:?}",
                    self.settings.shipment_timeout
                ),
                payload: None,
                timed_out: true,
            }),
        }
    }

    async fn call_shipment(
        &self,
        uow: &dyn UnitOfWork,
        carton: &Carton,
        scans: &[Scan],
        decision: FinalizeDecision,
    ) -> ScanResult<ShipmentReceipt> {
        match decision {
            FinalizeDecision::Confirm => {
                let skus = load_skus(uow, scans).await?;
                let lines = build_confirm_batch(
                    &carton.po_number,
                    scans,
                    &skus,
                    Utc::now().date_naive(),
                    &self.settings.default_size,
                );
                self.shipment.confirm(&lines).await
            }
            FinalizeDecision::Cancel => {
                let codes = build_cancel_codes(scans);
                self.shipment.cancel(&codes).await
            }
        }
    }
}

async fn load_skus(uow: &dyn UnitOfWork, scans: &[Scan]) -> ScanResult<HashMap<SkuCode, Sku>> {
    let mut skus = HashMap::new();
    for scan in scans {
        if skus.contains_key(&scan.sku) {
            continue;
        }
        let sku = uow
            .master_data()
            .find_sku(&scan.sku)
            .await?
            .ok_or_else(|| ScanError::not_found("sku", &scan.sku))?;
        skus.insert(scan.sku.clone(), sku);
    }
    Ok(skus)
}

async fn create_in(uow: &dyn UnitOfWork, cmd: &CreateCartonCommand) -> ScanResult<Carton> {
    if uow
        .master_data()
        .find_purchase_order(&cmd.po_number)
        .await?
        .is_none()
    {
        return Err(ScanError::not_found("purchase order", &cmd.po_number));
    }

    for line in &cmd.lines {
        if uow.master_data().find_sku(&line.sku).await?.is_none() {
            return Err(ScanError::not_found("sku", &line.sku));
        }
    }

    let carton = Carton::new(
        cmd.carton_id.clone(),
        cmd.po_number.clone(),
        cmd.total_expected(),
    );
    let plan: Vec<SkuPlanLine> = cmd
        .lines
        .iter()
        .map(|l| SkuPlanLine::new(carton.id.clone(), l.sku.clone(), l.quantity))
        .collect();

    match uow.cartons().insert(&carton, &plan).await {
        Ok(()) => Ok(carton),
        Err(AppError::Conflict(_)) => Err(ScanError::Conflict(format!(
            "carton {} already exists",
            carton.id
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn start_in(uow: &dyn UnitOfWork, carton_id: &CartonId) -> ScanResult<Carton> {
    let mut carton = uow
        .cartons()
        .lock_by_id(carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", carton_id))?;
    carton.transition_to(CartonStatus::InProgress)?;
    uow.cartons()
        .update_status(&carton.id, carton.status)
        .await?;
    Ok(carton)
}
