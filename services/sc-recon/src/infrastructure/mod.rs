//! 基础设施层

pub mod memory;
pub mod metrics;
pub mod persistence;
pub mod shipment;
