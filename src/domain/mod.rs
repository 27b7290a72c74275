// ==========================================
// 层级导入 - 领域模型层
// ==========================================
// 职责: 定义导入管道的实体与类型
// 红线: 不含数据访问逻辑,不含解析/校验逻辑
// ==========================================

pub mod import;
pub mod types;

// 重导出核心类型
pub use import::{
    DatePeriod, ErrorKind, ImportContext, ImportLog, ImportRecord, ImportRequest, ImportResult,
    ImportWarning, NewImportLog, NormalizedRecord, RawRow, RowError, WarningKind,
};
pub use types::{BatchState, EntityStatus, EntityType, FileType, ImportLogStatus};
