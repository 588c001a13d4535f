//! 强类型 ID 定义
//!
//! 装箱号、采购单号、SKU 与 UPC 是业务编码，扫描记录与箱子使用 UUID v7

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

macro_rules! business_code {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
        )]
        #[display("{_0}")]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// 去除首尾空白
            pub fn new(value: impl Into<String>) -> Self {
                let value = value.into();
                Self(value.trim().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
            Display, From,
        )]
        #[display("{_0}")]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }
    };
}

business_code!(
    /// 装箱号（业务主键）
    CartonId
);
business_code!(
    /// 采购单号
    PoNumber
);
business_code!(
    /// SKU 编码
    SkuCode
);
business_code!(
    /// UPC 条码
    Upc
);

uuid_id!(
    /// 装箱扫描记录 ID
    ScanId
);
uuid_id!(
    /// 箱子 ID
    BoxId
);
uuid_id!(
    /// 箱内扫描记录 ID
    BoxScanId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_codes_are_trimmed() {
        let id = CartonId::new("  CT-0001 \n");
        assert_eq!(id.as_str(), "CT-0001");
        assert_eq!(id.to_string(), "CT-0001");
        assert!(SkuCode::new("   ").is_empty());
    }

    #[test]
    fn test_uuid_ids_round_trip_through_str() {
        let id = BoxId::new();
        let parsed: BoxId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert!("not-a-uuid".parse::<ScanId>().is_err());
    }

    #[test]
    fn test_v7_ids_sort_by_creation() {
        let first = ScanId::new();
        let second = ScanId::new();
        assert!(first < second);
    }
}
