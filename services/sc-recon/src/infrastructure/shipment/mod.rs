//! 外部出货登记适配器

mod http_gateway;

pub use http_gateway::HttpShipmentGateway;
