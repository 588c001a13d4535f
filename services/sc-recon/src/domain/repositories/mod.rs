//! 仓储接口

mod box_repository;
mod carton_repository;
mod catalog_repository;
mod ledger_repository;
mod scan_repository;

pub use box_repository::{BoxRepository, BoxScanRepository};
pub use carton_repository::CartonRepository;
pub use catalog_repository::{CatalogRepository, MasterDataRepository};
pub use ledger_repository::{LedgerRepository, ReleaseOutcome, ReserveOutcome};
pub use scan_repository::{ScanRepository, ScanStatistics};
