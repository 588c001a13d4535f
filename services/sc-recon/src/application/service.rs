//! 对外服务入口
//!
//! 组合各引擎，API 层只依赖这一个类型

use std::sync::Arc;

use super::admission::{BoxScanOutcome, ScanAdmissionEngine};
use super::boxes::BoxRegistry;
use super::commands::*;
use super::lifecycle::{FinalizeOutcome, LifecycleController, LifecycleSettings};
use super::queries::*;
use super::reuse::{ReuseOutcome, ValidationReuseEngine};
use crate::domain::entities::{Carton, PackedBox, Scan};
use crate::domain::repositories::ScanStatistics;
use crate::domain::services::ShipmentGateway;
use crate::domain::unit_of_work::UnitOfWorkFactory;
use crate::domain::value_objects::{BoxDescriptor, BoxId, BoxScanId, CartonId, QrToken, ScanId};
use crate::error::ScanResult;

#[derive(Clone)]
pub struct ReconService {
    admission: Arc<ScanAdmissionEngine>,
    boxes: Arc<BoxRegistry>,
    reuse: Arc<ValidationReuseEngine>,
    lifecycle: Arc<LifecycleController>,
    queries: Arc<ReconQueries>,
}

impl ReconService {
    pub fn new(
        uow_factory: Arc<dyn UnitOfWorkFactory>,
        shipment: Arc<dyn ShipmentGateway>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            admission: Arc::new(ScanAdmissionEngine::new(uow_factory.clone())),
            boxes: Arc::new(BoxRegistry::new(uow_factory.clone())),
            reuse: Arc::new(ValidationReuseEngine::new(uow_factory.clone())),
            lifecycle: Arc::new(LifecycleController::new(
                uow_factory.clone(),
                shipment,
                settings,
            )),
            queries: Arc::new(ReconQueries::new(uow_factory)),
        }
    }

    // ========== 扫描 ==========

    pub async fn admit(&self, cmd: AdmitScanCommand) -> ScanResult<Scan> {
        self.admission.admit(cmd).await
    }

    pub async fn admit_to_box(&self, cmd: AdmitBoxScanCommand) -> ScanResult<BoxScanOutcome> {
        self.admission.admit_to_box(cmd).await
    }

    pub async fn delete_scan(&self, scan_id: ScanId) -> ScanResult<()> {
        self.admission.delete_scan(scan_id).await
    }

    pub async fn delete_box_scan(&self, box_scan_id: BoxScanId) -> ScanResult<()> {
        self.admission.delete_box_scan(box_scan_id).await
    }

    // ========== 箱子 ==========

    pub fn parse_box_code(&self, code: &str) -> ScanResult<BoxDescriptor> {
        ReconQueries::parse_box_code(code)
    }

    pub async fn register_box(&self, cmd: RegisterBoxCommand) -> ScanResult<PackedBox> {
        self.boxes.register_box(cmd).await
    }

    pub async fn assign_box(
        &self,
        box_id: BoxId,
        carton_id: Option<CartonId>,
    ) -> ScanResult<PackedBox> {
        self.boxes.assign_box(box_id, carton_id).await
    }

    pub async fn reuse(&self, cmd: ReuseValidationCommand) -> ScanResult<ReuseOutcome> {
        self.reuse.reuse(cmd).await
    }

    // ========== 生命周期 ==========

    pub async fn create_carton(&self, cmd: CreateCartonCommand) -> ScanResult<Carton> {
        self.lifecycle.create_carton(cmd).await
    }

    pub async fn start(&self, carton_id: &CartonId) -> ScanResult<Carton> {
        self.lifecycle.start(carton_id).await
    }

    pub async fn finalize(&self, cmd: FinalizeCartonCommand) -> ScanResult<FinalizeOutcome> {
        self.lifecycle.finalize(cmd).await
    }

    // ========== 查询 ==========

    pub async fn carton_progress(&self, carton_id: &CartonId) -> ScanResult<CartonProgress> {
        self.queries.carton_progress(carton_id).await
    }

    pub async fn list_scans(&self, carton_id: &CartonId) -> ScanResult<Vec<Scan>> {
        self.queries.list_scans(carton_id).await
    }

    pub async fn box_progress(&self, target: &BoxRef) -> ScanResult<BoxProgress> {
        self.queries.box_progress(target).await
    }

    pub async fn check_reusable(&self, code: &str) -> ScanResult<ReuseEligibility> {
        self.queries.check_reusable(code).await
    }

    pub async fn boxes_for_carton(&self, carton_id: &CartonId) -> ScanResult<Vec<PackedBox>> {
        self.queries.boxes_for_carton(carton_id).await
    }

    pub async fn scan_statistics(&self) -> ScanResult<ScanStatistics> {
        self.queries.scan_statistics().await
    }

    pub async fn preview_qr(&self, qr_token: &QrToken) -> ScanResult<QrPreview> {
        self.queries.preview_qr(qr_token).await
    }
}
