//! 数量台账存储接口
//!
//! 计划行上的已扫数量只通过条件更新增减，保证 `0 <= scanned <= expected`

use async_trait::async_trait;
use recon_errors::AppResult;

use crate::domain::entities::SkuPlanLine;
use crate::domain::enums::CartonStatus;
use crate::domain::value_objects::{CartonId, SkuCode};

/// 预占结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReserveOutcome {
    /// 已预占一件，返回更新后的计划行
    Reserved(SkuPlanLine),
    /// 已无余量
    Exhausted { expected: u32, scanned: u32 },
    /// 计划中没有该 SKU
    NotPlanned,
}

/// 释放结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released(SkuPlanLine),
    /// 装箱处于终态，计数冻结
    Locked(CartonStatus),
    NothingToRelease,
    NotPlanned,
}

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn plan_lines(&self, carton_id: &CartonId) -> AppResult<Vec<SkuPlanLine>>;

    async fn find_line(&self, carton_id: &CartonId, sku: &SkuCode)
    -> AppResult<Option<SkuPlanLine>>;

    /// 仅当 `scanned < expected` 时原子加一
    async fn reserve_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReserveOutcome>;

    /// 仅当装箱非终态且 `scanned > 0` 时原子减一
    async fn release_one(&self, carton_id: &CartonId, sku: &SkuCode) -> AppResult<ReleaseOutcome>;
}
