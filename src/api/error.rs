// ==========================================
// 层级导入 - API 层错误类型
// ==========================================
// 职责: 上传边界错误；将仓储 / 导入错误转换为调用方可读的错误
// ==========================================

use crate::importer::error::ImportError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API 层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 上传边界
    // ==========================================
    #[error("role '{role}' is not allowed to import (allowed: {allowed})")]
    Forbidden { role: String, allowed: String },

    #[error("file too large: {size} bytes (limit {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("unsupported file type: {0} (expected .xlsx, .xls or .csv)")]
    UnsupportedFileType(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // ==========================================
    // 数据访问
    // ==========================================
    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("database connection failed: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 导入
    // ==========================================
    #[error("import failed: {0}")]
    ImportError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{} (id={})", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("failed to acquire database lock: {}", msg))
            }
            RepositoryError::Other(err) => ApiError::Other(err),
            other => ApiError::DatabaseError(other.to_string()),
        }
    }
}

// ==========================================
// 从 ImportError 转换
// ==========================================
impl From<ImportError> for ApiError {
    fn from(err: ImportError) -> Self {
        match err {
            ImportError::Repository(e) => ApiError::from(e),
            ImportError::UnsupportedFormat(ext) => ApiError::UnsupportedFileType(ext),
            ImportError::Other(e) => ApiError::InternalError(e.to_string()),
            other => ApiError::ImportError(other.to_string()),
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_not_found_maps_to_not_found() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "ImportLog".to_string(),
            id: "log-1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "not found: ImportLog (id=log-1)");
    }

    #[test]
    fn test_import_repository_error_unwrapped() {
        let err: ApiError =
            ImportError::Repository(RepositoryError::DatabaseQueryError("disk I/O".to_string()))
                .into();
        assert!(matches!(err, ApiError::DatabaseError(_)));
    }
}
