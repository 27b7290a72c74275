// ==========================================
// 层级导入 - 导入领域模型
// ==========================================
// 职责: 原始行 / 规范化记录 / 校验后记录 / 行级错误 / 导入结果 / 导入日志
// 生命周期: RawRow → NormalizedRecord → ImportRecord 仅存在于单次管道运行内
//           ImportLog 每次运行创建一次、终态更新一次
// ==========================================

use crate::domain::types::{BatchState, EntityStatus, EntityType, FileType, ImportLogStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ==========================================
// RawRow - 文件解析输出的原始行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub sheet: Option<String>,          // 来源工作表（CSV 为 None）
    pub row_number: usize,              // 展示行号（表头为第 1 行）
    pub cells: HashMap<String, String>, // 原始表头 → 单元格文本
}

// ==========================================
// NormalizedRecord - 规范化后的记录（字段仍为文本）
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub entity_type: Option<String>,
    pub title: String,
    pub description: String,
    pub owner_email: String,
    pub department: String,
    pub status: String,
    pub progress: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub parent_title: Option<String>,

    // 元信息
    pub sheet: Option<String>,
    pub row_number: usize,
}

// ==========================================
// ImportRecord - 通过校验的规范记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub title: String,
    pub description: String,
    pub owner_email: String,
    pub department: String,
    pub status: EntityStatus,
    pub progress: u8,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub parent_title: Option<String>, // Objective 恒为 None

    // 元信息
    pub sheet: Option<String>,
    pub row_number: usize,
}

// ==========================================
// ErrorKind - 行级错误分类
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    File,           // 文件级致命错误
    FieldMissing,   // 必填字段缺失
    FieldInvalid,   // 枚举/范围/格式错误
    DateOrder,      // end_date <= start_date
    ParentNotFound, // 父级标题无法解析
    OwnerNotFound,  // 负责人邮箱无法解析
    Database,       // 落库失败
    RecordLimit,    // 超出单批记录上限
}

// ==========================================
// RowError - 行级诊断（对外报告的 ImportError）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowError {
    pub row: usize, // 与源文件展示行号一致；文件级错误为 0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub field: String,
    pub message: String,
    pub data: String, // 出错的原始值
    pub kind: ErrorKind,
}

// ==========================================
// ImportWarning - 非阻断提示
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    DuplicateTitle, // 同层级同标题，后者覆盖查找表
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportWarning {
    pub row: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub kind: WarningKind,
    pub message: String,
}

// ==========================================
// ImportResult - 管道返回值
// ==========================================
// 不变量: successful_records + failed_records == total_records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub errors: Vec<RowError>,
    pub warnings: Vec<ImportWarning>,
    pub import_log_id: String,
    pub state: BatchState,
}

// ==========================================
// ImportLog - 导入审计日志（持久化）
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportLog {
    pub id: String,
    pub tenant_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub file_type: FileType,
    pub status: ImportLogStatus,
    pub total_records: usize,
    pub successful_records: usize,
    pub failed_records: usize,
    pub errors: Vec<RowError>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 创建导入日志所需字段
#[derive(Debug, Clone)]
pub struct NewImportLog {
    pub tenant_id: String,
    pub uploaded_by: String,
    pub file_name: String,
    pub file_type: FileType,
    pub total_records: usize,
}

// ==========================================
// ImportContext - 贯穿各组件的不可变上下文
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ImportContext {
    pub tenant_id: String,
    pub uploader_id: String,
    pub department_mapping: HashMap<String, String>, // 工作表名 → 部门
}

impl ImportContext {
    pub fn new(tenant_id: impl Into<String>, uploader_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            uploader_id: uploader_id.into(),
            department_mapping: HashMap::new(),
        }
    }

    pub fn with_department_mapping(mut self, mapping: HashMap<String, String>) -> Self {
        self.department_mapping = mapping;
        self
    }
}

// ==========================================
// DatePeriod - 导入期间过滤
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DatePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// [start_date, end_date] 是否完全落在期间内
    pub fn contains_range(&self, start_date: NaiveDate, end_date: NaiveDate) -> bool {
        self.start <= start_date && end_date <= self.end
    }
}

// ==========================================
// ImportRequest - 一次上传的输入
// ==========================================
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub file_name: String,
    pub file_type: FileType,
    pub bytes: Vec<u8>,
    pub period: Option<DatePeriod>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_period_contains_range_inclusive() {
        let period = DatePeriod::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        );

        assert!(period.contains_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
        ));
        assert!(!period.contains_range(
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
        ));
        assert!(!period.contains_range(
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        ));
    }

    #[test]
    fn test_import_result_serializes_camel_case() {
        let result = ImportResult {
            success: true,
            total_records: 1,
            successful_records: 1,
            failed_records: 0,
            errors: vec![],
            warnings: vec![],
            import_log_id: "log-1".to_string(),
            state: BatchState::Completed,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalRecords"], 1);
        assert_eq!(json["importLogId"], "log-1");
        assert_eq!(json["state"], "COMPLETED");
    }
}
