//! PostgreSQL Unit of Work 实现
//!
//! 使用 SQLx Transaction 提供事务协调能力，保存点用于复用箱的逐件回滚。

use async_trait::async_trait;
use recon_adapter_postgres::{
    TransactionOptions, begin_with_options, create_savepoint, release_savepoint,
    rollback_to_savepoint,
};
use recon_errors::{AppError, AppResult};
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::domain::repositories::{
    BoxRepository, BoxScanRepository, CartonRepository, CatalogRepository, LedgerRepository,
    MasterDataRepository, ScanRepository,
};
use crate::domain::unit_of_work::{UnitOfWork, UnitOfWorkFactory};

use super::tx_repositories::{
    SharedTx, TxBoxRepository, TxBoxScanRepository, TxCartonRepository, TxCatalogRepository,
    TxLedgerRepository, TxMasterDataRepository, TxScanRepository,
};

/// PostgreSQL Unit of Work 工厂
pub struct PostgresUnitOfWorkFactory {
    pool: PgPool,
    options: TransactionOptions,
}

impl PostgresUnitOfWorkFactory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            options: TransactionOptions::default(),
        }
    }

    pub fn with_options(mut self, options: TransactionOptions) -> Self {
        self.options = options;
        self
    }
}

#[async_trait]
impl UnitOfWorkFactory for PostgresUnitOfWorkFactory {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = begin_with_options(&self.pool, &self.options).await?;
        Ok(Box::new(PostgresUnitOfWork::new(tx)))
    }
}

/// PostgreSQL Unit of Work 实现
///
/// 所有 Repository 操作都在同一个事务中执行。
pub struct PostgresUnitOfWork {
    tx: SharedTx,

    carton_repo: TxCartonRepository,
    ledger_repo: TxLedgerRepository,
    scan_repo: TxScanRepository,
    box_repo: TxBoxRepository,
    box_scan_repo: TxBoxScanRepository,
    catalog_repo: TxCatalogRepository,
    master_data_repo: TxMasterDataRepository,
}

impl PostgresUnitOfWork {
    fn new(tx: Transaction<'static, Postgres>) -> Self {
        let tx = Arc::new(Mutex::new(Some(tx)));

        Self {
            carton_repo: TxCartonRepository::new(tx.clone()),
            ledger_repo: TxLedgerRepository::new(tx.clone()),
            scan_repo: TxScanRepository::new(tx.clone()),
            box_repo: TxBoxRepository::new(tx.clone()),
            box_scan_repo: TxBoxScanRepository::new(tx.clone()),
            catalog_repo: TxCatalogRepository::new(tx.clone()),
            master_data_repo: TxMasterDataRepository::new(tx.clone()),
            tx,
        }
    }
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    fn cartons(&self) -> &dyn CartonRepository {
        &self.carton_repo
    }

    fn ledger(&self) -> &dyn LedgerRepository {
        &self.ledger_repo
    }

    fn scans(&self) -> &dyn ScanRepository {
        &self.scan_repo
    }

    fn boxes(&self) -> &dyn BoxRepository {
        &self.box_repo
    }

    fn box_scans(&self) -> &dyn BoxScanRepository {
        &self.box_scan_repo
    }

    fn catalog(&self) -> &dyn CatalogRepository {
        &self.catalog_repo
    }

    fn master_data(&self) -> &dyn MasterDataRepository {
        &self.master_data_repo
    }

    async fn savepoint(&self, name: &str) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        create_savepoint(&mut **tx, name).await
    }

    async fn rollback_to_savepoint(&self, name: &str) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        rollback_to_savepoint(&mut **tx, name).await
    }

    async fn release_savepoint(&self, name: &str) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        let tx = guard
            .as_mut()
            .ok_or_else(|| AppError::internal("Transaction consumed"))?;
        release_savepoint(&mut **tx, name).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.take() {
            tx.commit()
                .await
                .map_err(|e| AppError::database(format!("Failed to commit transaction: {}", e)))?;
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        let mut guard = self.tx.lock().await;
        if let Some(tx) = guard.take() {
            tx.rollback().await.map_err(|e| {
                AppError::database(format!("Failed to rollback transaction: {}", e))
            })?;
        }
        Ok(())
    }
}
