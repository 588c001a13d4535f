//! 二维码解析：令牌 → UPC → SKU

use serde::Serialize;

use crate::domain::repositories::CatalogRepository;
use crate::domain::value_objects::{QrToken, SkuCode, Upc};
use crate::error::ScanError;

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub qr_token: QrToken,
    pub upc: Upc,
    pub sku: SkuCode,
}

pub struct CatalogResolver<'a> {
    catalog: &'a dyn CatalogRepository,
}

impl<'a> CatalogResolver<'a> {
    pub fn new(catalog: &'a dyn CatalogRepository) -> Self {
        Self { catalog }
    }

    /// 目录中没有令牌返回 UnknownCode，UPC 未映射返回 UnmappedUpc
    pub async fn resolve(&self, qr_token: &QrToken) -> Result<Resolution, ScanError> {
        let record = self
            .catalog
            .latest_record(qr_token)
            .await?
            .ok_or_else(|| ScanError::UnknownCode(qr_token.to_string()))?;

        let sku = self
            .catalog
            .sku_for_upc(&record.upc)
            .await?
            .ok_or_else(|| ScanError::UnmappedUpc(record.upc.to_string()))?;

        Ok(Resolution {
            qr_token: qr_token.clone(),
            upc: record.upc,
            sku,
        })
    }
}
