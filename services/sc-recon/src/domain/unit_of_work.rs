//! Unit of Work 模式
//!
//! 一次扫描、一次复用或一次结箱在同一事务中完成，失败整体回滚。

use async_trait::async_trait;
use recon_errors::AppResult;

use crate::domain::repositories::{
    BoxRepository, BoxScanRepository, CartonRepository, CatalogRepository, LedgerRepository,
    MasterDataRepository, ScanRepository,
};

/// Unit of Work trait
///
/// ```ignore
/// let uow = uow_factory.begin().await?;
/// let carton = uow.cartons().lock_by_id(&carton_id).await?;
/// uow.ledger().reserve_one(&carton_id, &sku).await?;
/// uow.scans().insert(&scan).await?;
/// uow.commit().await?;
/// ```
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    fn cartons(&self) -> &dyn CartonRepository;

    fn ledger(&self) -> &dyn LedgerRepository;

    fn scans(&self) -> &dyn ScanRepository;

    fn boxes(&self) -> &dyn BoxRepository;

    fn box_scans(&self) -> &dyn BoxScanRepository;

    fn catalog(&self) -> &dyn CatalogRepository;

    fn master_data(&self) -> &dyn MasterDataRepository;

    /// 在当前事务内建立命名保存点
    async fn savepoint(&self, name: &str) -> AppResult<()>;

    /// 撤销保存点之后的所有更改，保存点本身保留
    async fn rollback_to_savepoint(&self, name: &str) -> AppResult<()>;

    async fn release_savepoint(&self, name: &str) -> AppResult<()>;

    /// 提交事务
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// 回滚事务
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

/// Unit of Work 工厂 trait
#[async_trait]
pub trait UnitOfWorkFactory: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}
