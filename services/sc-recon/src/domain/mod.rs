//! 领域层
//!
//! 实体、值对象、枚举、仓储接口、领域服务与工作单元

pub mod entities;
pub mod enums;
pub mod repositories;
pub mod services;
pub mod unit_of_work;
pub mod value_objects;

pub use entities::*;
pub use enums::*;
pub use repositories::*;
pub use services::*;
pub use unit_of_work::*;
pub use value_objects::*;
