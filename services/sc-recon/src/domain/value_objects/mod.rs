//! 值对象模块

mod box_code;
mod ids;
mod qr_token;
mod scan_context;

pub use box_code::BoxDescriptor;
pub use ids::{BoxId, BoxScanId, CartonId, PoNumber, ScanId, SkuCode, Upc};
pub use qr_token::QrToken;
pub use scan_context::ScanContext;
