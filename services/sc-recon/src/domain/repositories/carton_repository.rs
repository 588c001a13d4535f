//! 装箱仓储接口

use async_trait::async_trait;
use recon_errors::AppResult;

use crate::domain::entities::{Carton, SkuPlanLine};
use crate::domain::enums::CartonStatus;
use crate::domain::value_objects::CartonId;

#[async_trait]
pub trait CartonRepository: Send + Sync {
    async fn find_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>>;

    /// 读取并锁定装箱行，直到事务结束
    async fn lock_by_id(&self, id: &CartonId) -> AppResult<Option<Carton>>;

    /// 新建装箱与其计划行，装箱号重复时返回 Conflict
    async fn insert(&self, carton: &Carton, plan: &[SkuPlanLine]) -> AppResult<()>;

    async fn update_status(&self, id: &CartonId, status: CartonStatus) -> AppResult<()>;
}
