//! PostgreSQL 迁移管理
//!
//! 版本号递增执行，已执行的迁移以 SHA-256 校验和防篡改

use recon_errors::{AppError, AppResult};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::{info, warn};

const MIGRATION_TABLE: &str = "_recon_migrations";

/// 已执行的迁移记录
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub applied_at: chrono::DateTime<chrono::Utc>,
    pub checksum: String,
}

/// 迁移定义
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    /// 可包含多条语句
    pub up_sql: String,
    pub checksum: String,
}

impl Migration {
    pub fn new(version: i64, name: impl Into<String>, up_sql: impl Into<String>) -> Self {
        let up_sql = up_sql.into();
        let checksum = hex::encode(Sha256::digest(up_sql.as_bytes()));
        Self {
            version,
            name: name.into(),
            up_sql,
            checksum,
        }
    }
}

/// 迁移执行结果
#[derive(Debug, Clone, Default)]
pub struct MigrationResult {
    pub applied: Vec<i64>,
    pub skipped: Vec<i64>,
    pub errors: Vec<MigrationError>,
}

impl MigrationResult {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

#[derive(Debug, Clone)]
pub struct MigrationError {
    pub version: i64,
    pub name: String,
    pub error: String,
}

/// 迁移管理器
pub struct MigrationManager {
    pool: PgPool,
}

impl MigrationManager {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 初始化迁移表
    pub async fn init(&self) -> AppResult<()> {
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {MIGRATION_TABLE} (
                version BIGINT PRIMARY KEY,
                name VARCHAR(255) NOT NULL,
                applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                checksum VARCHAR(64) NOT NULL
            )
            "#
        );
        sqlx::query(&sql)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to create migration table: {}", e)))?;
        Ok(())
    }

    /// 已执行的迁移，按版本升序
    pub async fn applied_migrations(&self) -> AppResult<Vec<MigrationRecord>> {
        let sql = format!(
            "SELECT version, name, applied_at, checksum FROM {MIGRATION_TABLE} ORDER BY version ASC"
        );
        sqlx::query_as::<_, MigrationRecord>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to list migrations: {}", e)))
    }

    /// 在单个事务内执行迁移并登记
    pub async fn apply(&self, migration: &Migration) -> AppResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database(format!("Failed to begin transaction: {}", e)))?;

        sqlx::raw_sql(&migration.up_sql)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to apply migration {} ({}): {}",
                    migration.version, migration.name, e
                ))
            })?;

        sqlx::query(&format!(
            "INSERT INTO {MIGRATION_TABLE} (version, name, checksum) VALUES ($1, $2, $3)"
        ))
        .bind(migration.version)
        .bind(&migration.name)
        .bind(&migration.checksum)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database(format!("Failed to record migration: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Failed to commit migration: {}", e)))?;

        info!(version = migration.version, name = %migration.name, "Migration applied");
        Ok(())
    }

    /// 依次执行未执行的迁移，遇到失败即停止
    pub async fn migrate(&self, migrations: &[Migration]) -> AppResult<MigrationResult> {
        self.init().await?;

        let applied: HashMap<i64, MigrationRecord> = self
            .applied_migrations()
            .await?
            .into_iter()
            .map(|r| (r.version, r))
            .collect();

        let mut ordered: Vec<&Migration> = migrations.iter().collect();
        ordered.sort_by_key(|m| m.version);

        let mut result = MigrationResult::default();
        for migration in ordered {
            if let Some(record) = applied.get(&migration.version) {
                if record.checksum != migration.checksum {
                    warn!(version = migration.version, "Applied migration was modified");
                    result.errors.push(MigrationError {
                        version: migration.version,
                        name: migration.name.clone(),
                        error: "Checksum mismatch - migration has been modified".to_string(),
                    });
                } else {
                    result.skipped.push(migration.version);
                }
                continue;
            }

            if let Err(e) = self.apply(migration).await {
                result.errors.push(MigrationError {
                    version: migration.version,
                    name: migration.name.clone(),
                    error: e.to_string(),
                });
                break;
            }
            result.applied.push(migration.version);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_is_sha256_hex() {
        let migration = Migration::new(1, "init", "CREATE TABLE t (id INT)");
        assert_eq!(migration.checksum.len(), 64);
        assert!(migration.checksum.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_checksum_tracks_sql() {
        let a = Migration::new(1, "init", "CREATE TABLE a (id INT)");
        let b = Migration::new(1, "init", "CREATE TABLE a (id INT)");
        let c = Migration::new(1, "init", "CREATE TABLE c (id INT)");
        assert_eq!(a.checksum, b.checksum);
        assert_ne!(a.checksum, c.checksum);
    }

    #[test]
    fn test_result_success() {
        let result = MigrationResult {
            applied: vec![1, 2],
            ..Default::default()
        };
        assert!(result.is_success());
        assert_eq!(result.applied_count(), 2);
    }
}
