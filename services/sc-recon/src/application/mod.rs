//! 应用层

pub mod admission;
pub mod boxes;
pub mod commands;
pub mod lifecycle;
pub mod queries;
pub mod reuse;
mod service;

pub use admission::{BoxScanOutcome, ScanAdmissionEngine};
pub use boxes::BoxRegistry;
pub use commands::*;
pub use lifecycle::{FinalizeOutcome, LifecycleController, LifecycleSettings};
pub use queries::*;
pub use reuse::{ReuseItemOutcome, ReuseItemResult, ReuseOutcome, ValidationReuseEngine};
pub use service::ReconService;

use tracing::warn;

use crate::domain::unit_of_work::UnitOfWork;
use crate::error::ScanResult;

/// 成功则提交，失败则回滚并原样返回错误
pub(crate) async fn finish<T>(uow: Box<dyn UnitOfWork>, result: ScanResult<T>) -> ScanResult<T> {
    match result {
        Ok(value) => {
            uow.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = uow.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}
