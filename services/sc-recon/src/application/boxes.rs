//! 箱子登记与归属

use std::sync::Arc;

use recon_errors::AppError;
use tracing::info;

use super::commands::{BoxRef, RegisterBoxCommand};
use super::admission::lock_box;
use super::finish;
use crate::domain::entities::PackedBox;
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};
use crate::domain::value_objects::{BoxDescriptor, BoxId, CartonId};
use crate::error::{ScanError, ScanResult};

pub struct BoxRegistry {
    uow_factory: Arc<dyn UnitOfWorkFactory>,
}

impl BoxRegistry {
    pub fn new(uow_factory: Arc<dyn UnitOfWorkFactory>) -> Self {
        Self { uow_factory }
    }

    /// 解析箱码并登记，可选直接归属到装箱
    pub async fn register_box(&self, cmd: RegisterBoxCommand) -> ScanResult<PackedBox> {
        let descriptor = BoxDescriptor::parse(&cmd.code)?;
        let mut packed_box = PackedBox::new(cmd.code.as_str(), descriptor);

        let uow = self.uow_factory.begin().await?;
        let result = register_in(uow.as_ref(), &mut packed_box, cmd.carton_id.as_ref()).await;
        let result = finish(uow, result).await;

        if result.is_ok() {
            info!(
                box_id = %packed_box.id,
                code = %packed_box.code,
                sku = %packed_box.descriptor.sku,
                units = packed_box.expected_units(),
                "Box registered"
            );
        }
        result.map(|()| packed_box)
    }

    /// 变更箱子归属，`None` 表示解除归属
    pub async fn assign_box(
        &self,
        box_id: BoxId,
        carton_id: Option<CartonId>,
    ) -> ScanResult<PackedBox> {
        let uow = self.uow_factory.begin().await?;
        let result = assign_in(uow.as_ref(), box_id, carton_id).await;
        finish(uow, result).await
    }
}

async fn ensure_open_carton(uow: &dyn UnitOfWork, carton_id: &CartonId) -> ScanResult<()> {
    let carton = uow
        .cartons()
        .find_by_id(carton_id)
        .await?
        .ok_or_else(|| ScanError::not_found("carton", carton_id))?;
    carton.ensure_accepting_scans()
}

async fn register_in(
    uow: &dyn UnitOfWork,
    packed_box: &mut PackedBox,
    carton_id: Option<&CartonId>,
) -> ScanResult<()> {
    let sku = &packed_box.descriptor.sku;
    if uow.master_data().find_sku(sku).await?.is_none() {
        return Err(ScanError::not_found("sku", sku));
    }

    if let Some(carton_id) = carton_id {
        ensure_open_carton(uow, carton_id).await?;
        packed_box.assign_to(Some(carton_id.clone()));
    }

    if uow.boxes().find_by_code(&packed_box.code).await?.is_some() {
        return Err(ScanError::Conflict(format!(
            "box code {} is already registered",
            packed_box.code
        )));
    }

    match uow.boxes().insert(packed_box).await {
        Ok(()) => Ok(()),
        Err(AppError::Conflict(_)) => Err(ScanError::Conflict(format!(
            "box code {} is already registered",
            packed_box.code
        ))),
        Err(e) => Err(e.into()),
    }
}

async fn assign_in(
    uow: &dyn UnitOfWork,
    box_id: BoxId,
    carton_id: Option<CartonId>,
) -> ScanResult<PackedBox> {
    let mut packed_box = lock_box(uow.boxes(), &BoxRef::Id(box_id)).await?;
    if let Some(carton_id) = &carton_id {
        ensure_open_carton(uow, carton_id).await?;
    }
    packed_box.assign_to(carton_id);
    uow.boxes().update(&packed_box).await?;
    Ok(packed_box)
}
