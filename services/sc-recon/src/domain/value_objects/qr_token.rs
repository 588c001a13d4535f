//! 二维码令牌

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// 扫描枪读到的二维码内容
///
/// 可能是裸码，也可能是以裸码结尾的 URL
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct QrToken(String);

impl QrToken {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        Self(value.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 上报外部系统时使用的裸码
    ///
    /// 不含 `/` 时原样返回，否则取最后一个非空路径段
    pub fn bare_code(&self) -> &str {
        if !self.0.contains('/') {
            return &self.0;
        }
        self.0
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

impl From<&str> for QrToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for QrToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
