//! 箱子状态

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::UnknownStatus;

/// 箱子校验状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BoxStatus {
    #[default]
    Pending,
    /// 箱内匹配件数已达标
    Validated,
}

impl BoxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxStatus::Pending => "PENDING",
            BoxStatus::Validated => "VALIDATED",
        }
    }

    pub fn can_transition_to(&self, next: BoxStatus) -> bool {
        matches!((self, next), (BoxStatus::Pending, BoxStatus::Validated))
    }
}

impl fmt::Display for BoxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoxStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BoxStatus::Pending),
            "VALIDATED" => Ok(BoxStatus::Validated),
            other => Err(UnknownStatus {
                kind: "box status",
                value: other.to_string(),
            }),
        }
    }
}
