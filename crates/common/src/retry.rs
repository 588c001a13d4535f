//! 重试与退避
//!
//! 启动阶段连接数据库、调用外部接口前的预检等场景共用

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// 退避重试配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// 总尝试次数（含首次）
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_multiplier() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay,
            multiplier: default_multiplier(),
        }
    }

    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// 第 `attempt` 次失败（从 0 开始）后的等待时长，封顶 `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let millis = self.initial_delay.as_millis() as f64 * factor;
        let capped = millis.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// 连接类的瞬时故障特征
pub const TRANSIENT_ERROR_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection closed",
    "timed out",
    "timeout",
    "temporarily unavailable",
    "too many connections",
    "could not connect",
    "broken pipe",
    "pool timed out",
    "serialization failure",
    "deadlock detected",
];

/// 按错误文本判断是否属于可重试的瞬时故障
pub fn is_transient_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    TRANSIENT_ERROR_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
}

/// 失败即重试，直到次数用尽
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    with_retry_if(config, operation_name, operation, |_| true).await
}

/// 仅当 `should_retry` 认可该错误时才重试，否则立即返回
pub async fn with_retry_if<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        "Operation recovered after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max_attempts || !should_retry(&e) {
                    warn!(
                        operation = operation_name,
                        attempts = attempt,
                        error = %e,
                        "Operation failed, giving up"
                    );
                    return Err(e);
                }

                let delay = config.delay_for_attempt(attempt - 1);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
