//! 装箱扫描仓储接口

use async_trait::async_trait;
use recon_errors::AppResult;
use serde::Serialize;

use crate::domain::entities::Scan;
use crate::domain::value_objects::{CartonId, QrToken, ScanId};

/// 全部装箱扫描的汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ScanStatistics {
    /// 有扫描记录的装箱数
    pub total_cartons: u64,
    pub total_scans: u64,
    pub distinct_skus: u64,
    pub validated: u64,
    pub duplicate: u64,
    pub sku_mismatch: u64,
    pub error: u64,
}

#[async_trait]
pub trait ScanRepository: Send + Sync {
    async fn find_by_id(&self, id: &ScanId) -> AppResult<Option<Scan>>;

    async fn find_by_carton_and_token(
        &self,
        carton_id: &CartonId,
        qr_token: &QrToken,
    ) -> AppResult<Option<Scan>>;

    /// (装箱, 令牌) 唯一，冲突时返回 Conflict
    async fn insert(&self, scan: &Scan) -> AppResult<()>;

    async fn delete(&self, id: &ScanId) -> AppResult<bool>;

    /// 按扫描时间升序
    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<Scan>>;

    async fn statistics(&self) -> AppResult<ScanStatistics>;
}
