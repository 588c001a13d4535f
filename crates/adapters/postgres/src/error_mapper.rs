//! 数据库错误映射
//!
//! SQLx 错误到 AppError 的统一转换，唯一约束冲突保留约束名

use recon_errors::AppError;

/// PostgreSQL SQLSTATE: unique_violation
pub const UNIQUE_VIOLATION: &str = "23505";

/// 将 SQLx 错误转换为 AppError
pub fn map_sqlx_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::RowNotFound => AppError::not_found("Record not found"),
        sqlx::Error::Database(db_err) => {
            let constraint = db_err.constraint().unwrap_or("unknown").to_string();
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    AppError::conflict(format!("unique constraint {} violated", constraint))
                }
                Some("23503") => {
                    AppError::validation(format!("foreign key {} violated", constraint))
                }
                Some("23514") => {
                    AppError::validation(format!("check constraint {} violated", constraint))
                }
                Some("23502") => AppError::validation("Not null constraint violation"),
                Some("22001") => AppError::validation("String data too long"),
                Some("22P02") => AppError::validation("Invalid input syntax"),
                Some(code) => AppError::database(format!("Database error ({}): {}", code, db_err)),
                None => AppError::database(db_err.to_string()),
            }
        }
        sqlx::Error::PoolTimedOut => AppError::database("Database connection pool timed out"),
        sqlx::Error::PoolClosed => AppError::internal("Database connection pool is closed"),
        sqlx::Error::Protocol(msg) => {
            AppError::internal(format!("Database protocol error: {}", msg))
        }
        other => AppError::database(other.to_string()),
    }
}

/// 是否为唯一约束冲突
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION))
}
