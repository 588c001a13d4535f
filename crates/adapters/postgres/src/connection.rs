//! PostgreSQL 连接池
//!
//! 每个连接建立时写入会话参数：`lock_timeout` 限制等待装箱行锁的时间，
//! 结箱期间持锁调用外部系统时，并发扫描会在超时后失败而不是无限排队。

use std::str::FromStr;
use std::time::{Duration, Instant};

use recon_errors::{AppError, AppResult};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

/// 连接池与会话参数
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    /// 出现在 `pg_stat_activity.application_name`
    pub application_name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// 从池中取连接的等待上限
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    /// `None` 沿用服务端设置
    pub lock_timeout: Option<Duration>,
    pub statement_timeout: Option<Duration>,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            application_name: "sc-recon".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            lock_timeout: Some(Duration::from_secs(5)),
            statement_timeout: None,
        }
    }

    pub fn with_application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = name.into();
        self
    }

    pub fn with_max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self.min_connections = self.min_connections.min(max);
        self
    }

    pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// 零值视为不限制
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    pub fn with_statement_timeout(mut self, timeout: Duration) -> Self {
        self.statement_timeout = (!timeout.is_zero()).then_some(timeout);
        self
    }

    /// 连接时下发的会话参数，单位毫秒
    pub fn session_settings(&self) -> Vec<(&'static str, String)> {
        [
            ("lock_timeout", self.lock_timeout),
            ("statement_timeout", self.statement_timeout),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|d| (name, format!("{}ms", d.as_millis()))))
        .collect()
    }

    fn connect_options(&self) -> AppResult<PgConnectOptions> {
        let options = PgConnectOptions::from_str(&self.url)
            .map_err(|e| AppError::validation(format!("Invalid database URL: {}", e)))?;
        Ok(options
            .application_name(&self.application_name)
            .options(self.session_settings()))
    }
}

/// 创建连接池
pub async fn create_pool(config: &PostgresConfig) -> AppResult<PgPool> {
    let options = config.connect_options()?;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to create pool: {}", e)))
}

/// 执行一次往返查询，返回耗时
pub async fn check_connection(pool: &PgPool) -> AppResult<Duration> {
    let started = Instant::now();
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Database health check failed: {}", e)))?;
    Ok(started.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_min_below_max() {
        let config = PostgresConfig::new("postgres://localhost/recon")
            .with_max_connections(1)
            .with_acquire_timeout(Duration::from_secs(5));

        assert_eq!(config.max_connections, 1);
        assert!(config.min_connections <= config.max_connections);
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_session_settings() {
        let config = PostgresConfig::new("postgres://localhost/recon")
            .with_lock_timeout(Duration::from_millis(2_500))
            .with_statement_timeout(Duration::from_secs(60));

        assert_eq!(
            config.session_settings(),
            vec![
                ("lock_timeout", "2500ms".to_string()),
                ("statement_timeout", "60000ms".to_string()),
            ]
        );
    }

    #[test]
    fn test_zero_timeout_disables_setting() {
        let config =
            PostgresConfig::new("postgres://localhost/recon").with_lock_timeout(Duration::ZERO);

        assert!(config.lock_timeout.is_none());
        assert!(config.session_settings().is_empty());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = PostgresConfig::new("not a url").connect_options().unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
