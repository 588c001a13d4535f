//! 领域服务

mod catalog_resolver;
mod quantity_ledger;
mod shipment;

pub use catalog_resolver::{CatalogResolver, Resolution};
pub use quantity_ledger::QuantityLedger;
pub use shipment::{
    ShipmentGateway, ShipmentLine, ShipmentReceipt, build_cancel_codes, build_confirm_batch,
};
