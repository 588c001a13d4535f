//! 数量台账
//!
//! 把存储层的条件更新结果翻译成业务错误

use tracing::debug;

use crate::domain::entities::SkuPlanLine;
use crate::domain::repositories::{LedgerRepository, ReleaseOutcome, ReserveOutcome};
use crate::domain::value_objects::{CartonId, SkuCode};
use crate::error::ScanError;

pub struct QuantityLedger<'a> {
    repo: &'a dyn LedgerRepository,
}

impl<'a> QuantityLedger<'a> {
    pub fn new(repo: &'a dyn LedgerRepository) -> Self {
        Self { repo }
    }

    /// 预占一件，余量不足时返回 QuotaExceeded
    pub async fn reserve_one(
        &self,
        carton_id: &CartonId,
        sku: &SkuCode,
    ) -> Result<SkuPlanLine, ScanError> {
        match self.repo.reserve_one(carton_id, sku).await? {
            ReserveOutcome::Reserved(line) => {
                debug!(carton_id = %carton_id, sku = %sku, scanned = line.scanned, "Reserved unit");
                Ok(line)
            }
            ReserveOutcome::Exhausted { expected, scanned } => Err(ScanError::QuotaExceeded {
                sku: sku.to_string(),
                expected,
                scanned,
            }),
            ReserveOutcome::NotPlanned => Err(ScanError::SkuNotExpected {
                carton_id: carton_id.to_string(),
                sku: sku.to_string(),
            }),
        }
    }

    /// 归还一件，终态装箱返回 LockedState
    pub async fn release_one(
        &self,
        carton_id: &CartonId,
        sku: &SkuCode,
    ) -> Result<Option<SkuPlanLine>, ScanError> {
        match self.repo.release_one(carton_id, sku).await? {
            ReleaseOutcome::Released(line) => Ok(Some(line)),
            ReleaseOutcome::Locked(status) => Err(ScanError::LockedState(format!(
                "carton {} is {}, counts are frozen",
                carton_id, status
            ))),
            ReleaseOutcome::NothingToRelease | ReleaseOutcome::NotPlanned => Ok(None),
        }
    }
}
