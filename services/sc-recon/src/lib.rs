//! sc-recon - 入库箱扫码对账
//!
//! 将逐件扫描的二维码与采购单装箱计划核对，维护每个 SKU 的已扫数量，
//! 并在确认或取消时向外部出货系统登记。

pub mod application;
pub mod bootstrap;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::ReconService;
pub use error::{ScanError, ScanResult};
