//! 错误类型

use std::fmt;
use thiserror::Error;

/// 统一结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 查找失败的实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Branch,
    Category,
    LineItemPool,
    InvoiceCounter,
    PurchaseTransaction,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Branch => write!(f, "Branch"),
            Self::Category => write!(f, "Category"),
            Self::LineItemPool => write!(f, "Purchase transactions"),
            Self::InvoiceCounter => write!(f, "Invoice counter"),
            Self::PurchaseTransaction => write!(f, "Transaction"),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(Entity),

    /// 搜索空间已穷尽, 没有组合恰好等于目标金额
    #[error("No matching transactions found")]
    NoMatchingTransactions,

    #[error("Search gave up after {0} steps without an exact match")]
    SearchBudgetExhausted(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Concurrent update conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Render error: {0}")]
    Render(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::NoMatchingTransactions | Self::SearchBudgetExhausted(_) => 422,
            Self::InvalidInput(_) => 400,
            Self::ConcurrencyConflict(_) => 409,
            Self::Database(_) | Self::Render(_) | Self::Internal(_) => 500,
        }
    }

    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::NoMatchingTransactions => "NO_MATCHING_TRANSACTIONS",
            Self::SearchBudgetExhausted(_) => "SEARCH_BUDGET_EXHAUSTED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::ConcurrencyConflict(_) => "CONCURRENCY_CONFLICT",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Render(_) => "RENDER_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 可以通过重试解决的错误
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 40001: serialization_failure, 40P01: deadlock_detected
            if matches!(db_err.code().as_deref(), Some("40001") | Some("40P01")) {
                return Self::ConcurrencyConflict(db_err.message().to_string());
            }
        }
        Self::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("background task failed: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::NotFound(Entity::Branch).status_code(), 404);
        assert_eq!(AppError::NoMatchingTransactions.status_code(), 422);
        assert_eq!(AppError::SearchBudgetExhausted(10).status_code(), 422);
        assert_eq!(AppError::InvalidInput(String::new()).status_code(), 400);
        assert_eq!(AppError::ConcurrencyConflict(String::new()).status_code(), 409);
        assert_eq!(AppError::Database(String::new()).status_code(), 500);
        assert_eq!(AppError::Render(String::new()).status_code(), 500);
    }

    #[test]
    fn test_error_display() {
        assert_eq!(AppError::NotFound(Entity::Branch).to_string(), "Branch not found");
        assert_eq!(
            AppError::NotFound(Entity::LineItemPool).to_string(),
            "Purchase transactions not found"
        );
        assert_eq!(
            AppError::NotFound(Entity::PurchaseTransaction).to_string(),
            "Transaction not found"
        );
        assert_eq!(
            AppError::NoMatchingTransactions.to_string(),
            "No matching transactions found"
        );
        assert_eq!(
            AppError::InvalidInput("bad".into()).to_string(),
            "Invalid input: bad"
        );
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(AppError::ConcurrencyConflict("x".into()).is_retryable());
        assert!(!AppError::NoMatchingTransactions.is_retryable());
        assert!(!AppError::Database("x".into()).is_retryable());
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }
}
