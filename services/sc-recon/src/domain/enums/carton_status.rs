//! 装箱状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownStatus;

/// 装箱状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartonStatus {
    /// 已创建，未开始
    #[default]
    Pending,
    /// 扫描中
    InProgress,
    /// 已确认并登记出货
    Completed,
    /// 已取消
    Canceled,
}

/// 允许的状态迁移
const TRANSITIONS: &[(CartonStatus, CartonStatus)] = &[
    (CartonStatus::Pending, CartonStatus::InProgress),
    (CartonStatus::InProgress, CartonStatus::Completed),
    (CartonStatus::InProgress, CartonStatus::Canceled),
];

impl CartonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartonStatus::Pending => "PENDING",
            CartonStatus::InProgress => "IN_PROGRESS",
            CartonStatus::Completed => "COMPLETED",
            CartonStatus::Canceled => "CANCELED",
        }
    }

    /// 终态下扫描与计数均冻结
    pub fn is_terminal(&self) -> bool {
        matches!(self, CartonStatus::Completed | CartonStatus::Canceled)
    }

    /// 是否接受新的扫描
    pub fn accepts_scans(&self) -> bool {
        !self.is_terminal()
    }

    pub fn can_transition_to(&self, next: CartonStatus) -> bool {
        TRANSITIONS.contains(&(*self, next))
    }
}

impl fmt::Display for CartonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CartonStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(CartonStatus::Pending),
            "IN_PROGRESS" => Ok(CartonStatus::InProgress),
            "COMPLETED" => Ok(CartonStatus::Completed),
            "CANCELED" => Ok(CartonStatus::Canceled),
            other => Err(UnknownStatus {
                kind: "carton status",
                value: other.to_string(),
            }),
        }
    }
}
