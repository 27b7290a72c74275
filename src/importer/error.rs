// ==========================================
// 层级导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 分类: 文件级致命错误 / 行级非致命错误 / 基础设施错误
// ==========================================

use crate::domain::import::{ErrorKind, RowError};
use crate::domain::types::EntityType;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 文件相关错误（致命，终止整个批次）=====
    #[error("Unsupported file type: {0} (expected .xlsx/.xls/.csv)")]
    UnsupportedFormat(String),

    #[error("Unable to read file: {0}")]
    FileReadError(String),

    #[error("Unable to parse workbook: {0}")]
    ExcelParseError(String),

    #[error("Unable to parse delimited text: {0}")]
    CsvParseError(String),

    // ===== 行级错误（非致命，仅排除所在行）=====
    #[error("Missing required field: {field}")]
    FieldMissing { field: String },

    #[error("{message}")]
    FieldInvalid {
        field: String,
        value: String,
        message: String,
    },

    #[error("end_date ({end}) must be after start_date ({start})")]
    DateOrder { start: String, end: String },

    #[error("Parent {parent_type} not found: {title}")]
    ParentNotFound {
        parent_type: EntityType,
        title: String,
    },

    #[error("Owner not found: {email}")]
    OwnerNotFound { email: String },

    #[error("Failed to create {entity_type}: {message}")]
    Database {
        entity_type: EntityType,
        message: String,
    },

    #[error("Record limit exceeded: at most {max} records per import")]
    RecordLimit { max: usize },

    // ===== 基础设施错误 =====
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ImportError {
    /// 是否为终止批次的文件级错误
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::UnsupportedFormat(_)
                | ImportError::FileReadError(_)
                | ImportError::ExcelParseError(_)
                | ImportError::CsvParseError(_)
        )
    }

    /// 错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            ImportError::FieldMissing { .. } => ErrorKind::FieldMissing,
            ImportError::FieldInvalid { .. } => ErrorKind::FieldInvalid,
            ImportError::DateOrder { .. } => ErrorKind::DateOrder,
            ImportError::ParentNotFound { .. } => ErrorKind::ParentNotFound,
            ImportError::OwnerNotFound { .. } => ErrorKind::OwnerNotFound,
            ImportError::RecordLimit { .. } => ErrorKind::RecordLimit,
            ImportError::Database { .. }
            | ImportError::Repository(_)
            | ImportError::Other(_) => ErrorKind::Database,
            _ => ErrorKind::File,
        }
    }

    /// 错误归属字段
    pub fn field(&self) -> String {
        match self {
            ImportError::FieldMissing { field } | ImportError::FieldInvalid { field, .. } => {
                field.clone()
            }
            ImportError::DateOrder { .. } => "end_date".to_string(),
            ImportError::ParentNotFound { .. } => "parent_title".to_string(),
            ImportError::OwnerNotFound { .. } => "owner_email".to_string(),
            ImportError::RecordLimit { .. } => "row".to_string(),
            ImportError::Database { .. } | ImportError::Repository(_) | ImportError::Other(_) => {
                "database".to_string()
            }
            _ => "file".to_string(),
        }
    }

    /// 转换为对外报告的行级错误
    ///
    /// # 参数
    /// - row: 展示行号（文件级错误传 0）
    /// - sheet: 来源工作表
    /// - data: 出错的原始值
    pub fn to_row_error(&self, row: usize, sheet: Option<&str>, data: impl Into<String>) -> RowError {
        RowError {
            row,
            sheet: sheet.map(str::to_string),
            field: self.field(),
            message: self.to_string(),
            data: data.into(),
            kind: self.kind(),
        }
    }
}

// 实现 From<std::io::Error>
impl From<std::io::Error> for ImportError {
    fn from(err: std::io::Error) -> Self {
        ImportError::FileReadError(err.to_string())
    }
}

// 实现 From<csv::Error>
impl From<csv::Error> for ImportError {
    fn from(err: csv::Error) -> Self {
        ImportError::CsvParseError(err.to_string())
    }
}

// 实现 From<calamine::Error>
impl From<calamine::Error> for ImportError {
    fn from(err: calamine::Error) -> Self {
        ImportError::ExcelParseError(err.to_string())
    }
}

/// Result 类型别名
pub type ImporterResult<T> = Result<T, ImportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_not_found_message_and_field() {
        let err = ImportError::ParentNotFound {
            parent_type: EntityType::Initiative,
            title: "Launch Campain".to_string(),
        };

        assert_eq!(err.to_string(), "Parent initiative not found: Launch Campain");
        assert_eq!(err.field(), "parent_title");
        assert_eq!(err.kind(), ErrorKind::ParentNotFound);
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_file_error_to_row_error() {
        let err = ImportError::ExcelParseError("invalid zip header".to_string());
        let row_error = err.to_row_error(0, None, "plan.xlsx");

        assert!(err.is_fatal());
        assert_eq!(row_error.row, 0);
        assert_eq!(row_error.field, "file");
        assert_eq!(row_error.kind, ErrorKind::File);
        assert!(row_error.message.contains("invalid zip header"));
    }

    #[test]
    fn test_date_order_targets_end_date() {
        let err = ImportError::DateOrder {
            start: "2024-03-01".to_string(),
            end: "2024-02-01".to_string(),
        };
        assert_eq!(err.field(), "end_date");
        assert_eq!(err.kind(), ErrorKind::DateOrder);
    }
}
