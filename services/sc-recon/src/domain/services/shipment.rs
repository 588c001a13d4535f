//! 出货登记端口
//!
//! 结箱确认时按 SKU 汇总已校验的二维码上报，取消时上报裸码列表

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::entities::{Scan, Sku};
use crate::domain::value_objects::{PoNumber, SkuCode};
use crate::error::ScanError;

const NO_COLOR: &str = "N/A";

/// 确认登记的一行，每个 SKU 一行
///
/// 字段名按下游接口使用 PascalCase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ShipmentLine {
    pub po_no: String,
    pub style_no: String,
    pub style_name: String,
    pub color: String,
    pub color_name: String,
    pub size: String,
    pub quantity: u32,
    #[serde(rename = "CfmXfDate")]
    pub confirm_date: NaiveDate,
    pub codes: Vec<String>,
}

/// 外部系统的应答
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ShipmentReceipt {
    pub payload: serde_json::Value,
}

/// 外部出货登记系统
///
/// 失败时返回 `ScanError::External`
#[async_trait]
pub trait ShipmentGateway: Send + Sync {
    async fn confirm(&self, lines: &[ShipmentLine]) -> Result<ShipmentReceipt, ScanError>;

    async fn cancel(&self, codes: &[String]) -> Result<ShipmentReceipt, ScanError>;
}

/// 按 SKU 汇总已校验扫描，输出顺序按 SKU 编码排序
pub fn build_confirm_batch(
    po_number: &PoNumber,
    scans: &[Scan],
    skus: &HashMap<SkuCode, Sku>,
    confirm_date: NaiveDate,
    default_size: &str,
) -> Vec<ShipmentLine> {
    let mut grouped: BTreeMap<&SkuCode, Vec<&Scan>> = BTreeMap::new();
    for scan in scans.iter().filter(|s| s.counts_toward_plan()) {
        grouped.entry(&scan.sku).or_default().push(scan);
    }

    grouped
        .into_iter()
        .map(|(sku_code, scans)| {
            let sku = skus.get(sku_code);
            let description = sku.map(|s| s.description.clone()).unwrap_or_default();
            ShipmentLine {
                po_no: po_number.to_string(),
                style_no: sku_code.to_string(),
                style_name: description.clone(),
                color: sku
                    .and_then(|s| s.color.clone())
                    .unwrap_or_else(|| NO_COLOR.to_string()),
                color_name: description,
                size: sku
                    .and_then(|s| s.size.clone())
                    .unwrap_or_else(|| default_size.to_string()),
                quantity: scans.len() as u32,
                confirm_date,
                codes: scans
                    .iter()
                    .map(|s| s.qr_token.bare_code().to_string())
                    .collect(),
            }
        })
        .collect()
}

/// 取消登记使用的裸码列表
pub fn build_cancel_codes(scans: &[Scan]) -> Vec<String> {
    scans
        .iter()
        .filter(|s| s.counts_toward_plan())
        .map(|s| s.qr_token.bare_code().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::enums::ScanStatus;
    use crate::domain::value_objects::{CartonId, QrToken, ScanContext, Upc};

    fn scan(sku: &str, token: &str) -> Scan {
        Scan::validated(
            CartonId::new("CT-1"),
            SkuCode::new(sku),
            QrToken::new(token),
            Upc::new("0001"),
            &ScanContext::system(),
        )
    }

    #[test]
    fn test_groups_by_sku_with_bare_codes() {
        let scans = vec![
            scan("SKU-B", "https://qr.local/p/B1"),
            scan("SKU-A", "A1"),
            scan("SKU-B", "https://qr.local/p/B2"),
        ];
        let mut skus = HashMap::new();
        skus.insert(
            SkuCode::new("SKU-A"),
            Sku::new("SKU-A", "Classic Clog").with_color("Black").with_size("L"),
        );
        skus.insert(SkuCode::new("SKU-B"), Sku::new("SKU-B", "Slide"));
        let date = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();

        let lines = build_confirm_batch(&PoNumber::new("PO-9"), &scans, &skus, date, "M");

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].style_no, "SKU-A");
        assert_eq!(lines[0].color, "Black");
        assert_eq!(lines[0].size, "L");
        assert_eq!(lines[0].quantity, 1);

        assert_eq!(lines[1].style_no, "SKU-B");
        assert_eq!(lines[1].style_name, "Slide");
        assert_eq!(lines[1].color, "N/A");
        assert_eq!(lines[1].size, "M");
        assert_eq!(lines[1].codes, vec!["B1", "B2"]);
    }

    #[test]
    fn test_non_validated_scans_are_left_out() {
        let mut duplicate = scan("SKU-A", "A2");
        duplicate.status = ScanStatus::Duplicate;
        let scans = vec![scan("SKU-A", "A1"), duplicate];

        assert_eq!(build_cancel_codes(&scans), vec!["A1"]);
    }

    #[test]
    fn test_wire_field_names() {
        let line = ShipmentLine {
            po_no: "PO".into(),
            style_no: "S".into(),
            style_name: "N".into(),
            color: "C".into(),
            color_name: "N".into(),
            size: "M".into(),
            quantity: 1,
            confirm_date: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            codes: vec!["X".into()],
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["PoNo"], "PO");
        assert_eq!(json["StyleNo"], "S");
        assert_eq!(json["StyleName"], "N");
        assert_eq!(json["ColorName"], "N");
        assert_eq!(json["Quantity"], 1);
        assert_eq!(json["CfmXfDate"], "2025-01-02");
        assert_eq!(json["Codes"][0], "X");
        assert!(json.get("poNo").is_none());
    }
}
