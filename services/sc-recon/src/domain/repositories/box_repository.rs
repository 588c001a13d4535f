//! 箱子与箱内扫描仓储接口

use async_trait::async_trait;
use recon_errors::AppResult;

use crate::domain::entities::{BoxScan, PackedBox};
use crate::domain::value_objects::{BoxId, BoxScanId, CartonId, QrToken};

#[async_trait]
pub trait BoxRepository: Send + Sync {
    async fn find_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>>;

    async fn find_by_code(&self, code: &str) -> AppResult<Option<PackedBox>>;

    /// 读取并锁定箱子行，直到事务结束
    async fn lock_by_id(&self, id: &BoxId) -> AppResult<Option<PackedBox>>;

    async fn lock_by_code(&self, code: &str) -> AppResult<Option<PackedBox>>;

    /// 箱码重复时返回 Conflict
    async fn insert(&self, packed_box: &PackedBox) -> AppResult<()>;

    /// 更新装箱归属与校验状态
    async fn update(&self, packed_box: &PackedBox) -> AppResult<()>;

    /// 归属于该装箱的箱子，按登记时间升序
    async fn list_by_carton(&self, carton_id: &CartonId) -> AppResult<Vec<PackedBox>>;
}

#[async_trait]
pub trait BoxScanRepository: Send + Sync {
    async fn find_by_id(&self, id: &BoxScanId) -> AppResult<Option<BoxScan>>;

    async fn find_by_box_and_token(
        &self,
        box_id: &BoxId,
        qr_token: &QrToken,
    ) -> AppResult<Option<BoxScan>>;

    /// (箱子, 令牌) 唯一，冲突时返回 Conflict
    async fn insert(&self, scan: &BoxScan) -> AppResult<()>;

    async fn delete(&self, id: &BoxScanId) -> AppResult<bool>;

    /// 按扫描时间升序
    async fn list_by_box(&self, box_id: &BoxId) -> AppResult<Vec<BoxScan>>;

    /// SKU 与箱码一致的扫描数
    async fn count_matching(&self, box_id: &BoxId) -> AppResult<u32>;
}
