//! 实体模块

mod carton;
mod catalog;
mod master_data;
mod packed_box;
mod scan;

pub use carton::{Carton, SkuPlanLine};
pub use catalog::{CatalogRecord, UpcMapping};
pub use master_data::{PurchaseOrder, Sku};
pub use packed_box::{BoxScan, PackedBox};
pub use scan::Scan;
