//! PostgreSQL 事务与 savepoint

use recon_errors::{AppError, AppResult};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;

/// 事务隔离级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum IsolationLevel {
    /// 读已提交（PostgreSQL 默认）
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// 事务访问模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    #[default]
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "READ WRITE",
            AccessMode::ReadOnly => "READ ONLY",
        }
    }
}

/// 事务选项
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub isolation_level: IsolationLevel,
    pub access_mode: AccessMode,
    /// 语句超时（毫秒），0 表示不限
    pub statement_timeout_ms: u64,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = level;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.access_mode = AccessMode::ReadOnly;
        self
    }

    pub fn with_statement_timeout_ms(mut self, millis: u64) -> Self {
        self.statement_timeout_ms = millis;
        self
    }

    /// 生成 SET TRANSACTION 语句
    pub fn to_sql(&self) -> String {
        format!(
            "SET TRANSACTION ISOLATION LEVEL {}, {}",
            self.isolation_level.as_sql(),
            self.access_mode.as_sql()
        )
    }

    fn is_default(&self) -> bool {
        self.isolation_level == IsolationLevel::ReadCommitted
            && self.access_mode == AccessMode::ReadWrite
            && self.statement_timeout_ms == 0
    }
}

/// 按选项开启事务，默认选项不额外发送语句
pub async fn begin_with_options(
    pool: &PgPool,
    options: &TransactionOptions,
) -> AppResult<Transaction<'static, Postgres>> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

    if options.is_default() {
        return Ok(tx);
    }

    sqlx::query(&options.to_sql())
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to set transaction options: {}", e)))?;

    if options.statement_timeout_ms > 0 {
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            options.statement_timeout_ms
        ))
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to set statement timeout: {}", e)))?;
    }

    Ok(tx)
}

/// savepoint 名称只允许字母、数字与下划线，且不以数字开头
pub fn validate_savepoint_name(name: &str) -> AppResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid && name.len() <= 63 {
        Ok(())
    } else {
        Err(AppError::internal(format!("Invalid savepoint name: {:?}", name)))
    }
}

async fn execute_savepoint_command(conn: &mut PgConnection, sql: String) -> AppResult<()> {
    debug!(sql = %sql, "Savepoint command");
    sqlx::query(&sql)
        .execute(conn)
        .await
        .map_err(|e| AppError::database(format!("{} failed: {}", sql, e)))?;
    Ok(())
}

/// SAVEPOINT name
pub async fn create_savepoint(conn: &mut PgConnection, name: &str) -> AppResult<()> {
    validate_savepoint_name(name)?;
    execute_savepoint_command(conn, format!("SAVEPOINT {}", name)).await
}

/// ROLLBACK TO SAVEPOINT name
pub async fn rollback_to_savepoint(conn: &mut PgConnection, name: &str) -> AppResult<()> {
    validate_savepoint_name(name)?;
    execute_savepoint_command(conn, format!("ROLLBACK TO SAVEPOINT {}", name)).await
}

/// RELEASE SAVEPOINT name
pub async fn release_savepoint(conn: &mut PgConnection, name: &str) -> AppResult<()> {
    validate_savepoint_name(name)?;
    execute_savepoint_command(conn, format!("RELEASE SAVEPOINT {}", name)).await
}
