//! recon-common - 入库对账各组件共用的工具

pub mod retry;

pub use retry::*;
