//! 目录与主数据的只读接口

use async_trait::async_trait;
use recon_errors::AppResult;

use crate::domain::entities::{CatalogRecord, PurchaseOrder, Sku};
use crate::domain::value_objects::{PoNumber, QrToken, SkuCode, Upc};

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// 令牌最近一次同步的记录
    async fn latest_record(&self, qr_token: &QrToken) -> AppResult<Option<CatalogRecord>>;

    async fn sku_for_upc(&self, upc: &Upc) -> AppResult<Option<SkuCode>>;
}

#[async_trait]
pub trait MasterDataRepository: Send + Sync {
    async fn find_purchase_order(&self, number: &PoNumber) -> AppResult<Option<PurchaseOrder>>;

    async fn find_sku(&self, code: &SkuCode) -> AppResult<Option<Sku>>;
}
