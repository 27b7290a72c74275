// ==========================================
// 层级导入 - 领域类型定义
// ==========================================
// 职责: 层级类型 / 实体状态 / 文件类型 / 批次状态机
// 序列化格式: snake_case (与数据库、模板列值一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 层级类型 (Entity Type)
// ==========================================
// 父子顺序: Objective → Initiative → Activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Objective,  // 战略目标
    Initiative, // 举措
    Activity,   // 活动
}

impl EntityType {
    /// 按依赖顺序排列的全部层级（父层在前）
    pub const LEVELS: [EntityType; 3] = [
        EntityType::Objective,
        EntityType::Initiative,
        EntityType::Activity,
    ];

    /// 父层级；顶层返回 None
    pub fn parent(self) -> Option<EntityType> {
        match self {
            EntityType::Objective => None,
            EntityType::Initiative => Some(EntityType::Objective),
            EntityType::Activity => Some(EntityType::Initiative),
        }
    }

    /// 是否必须携带 parent_title
    pub fn requires_parent(self) -> bool {
        self.parent().is_some()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityType::Objective => "objective",
            EntityType::Initiative => "initiative",
            EntityType::Activity => "activity",
        }
    }

    /// 解析类型列（大小写不敏感）
    pub fn parse(value: &str) -> Option<EntityType> {
        match value.trim().to_lowercase().as_str() {
            "objective" => Some(EntityType::Objective),
            "initiative" => Some(EntityType::Initiative),
            "activity" => Some(EntityType::Activity),
            _ => None,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 实体状态 (Entity Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityStatus {
    #[default]
    NotStarted, // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
    Paused,     // 已暂停
}

impl EntityStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityStatus::NotStarted => "not_started",
            EntityStatus::InProgress => "in_progress",
            EntityStatus::Completed => "completed",
            EntityStatus::Paused => "paused",
        }
    }

    /// 解析状态列
    ///
    /// 接受 "In Progress" / "in-progress" / "IN_PROGRESS" 等写法
    pub fn parse(value: &str) -> Option<EntityStatus> {
        let normalized: String = value
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_");

        match normalized.as_str() {
            "not_started" => Some(EntityStatus::NotStarted),
            "in_progress" => Some(EntityStatus::InProgress),
            "completed" => Some(EntityStatus::Completed),
            "paused" => Some(EntityStatus::Paused),
            _ => None,
        }
    }
}

impl fmt::Display for EntityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 文件类型 (File Type)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Xlsx, // Excel 2007+
    Xls,  // Excel 97-2003
    Csv,  // 分隔文本
}

impl FileType {
    /// 根据文件名扩展名推断文件类型
    pub fn from_file_name(file_name: &str) -> Option<FileType> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "xlsx" | "xlsm" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            "csv" | "tsv" | "txt" => Some(FileType::Csv),
            _ => None,
        }
    }

    /// 解析存储值（"xlsx" / "xls" / "csv"）
    pub fn parse(value: &str) -> Option<FileType> {
        match value {
            "xlsx" => Some(FileType::Xlsx),
            "xls" => Some(FileType::Xls),
            "csv" => Some(FileType::Csv),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileType::Xlsx => "xlsx",
            FileType::Xls => "xls",
            FileType::Csv => "csv",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 导入日志状态 (Import Log Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportLogStatus {
    Processing, // 处理中
    Completed,  // 零错误完成
    Failed,     // 存在错误（含部分成功）
}

impl ImportLogStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ImportLogStatus::Processing => "processing",
            ImportLogStatus::Completed => "completed",
            ImportLogStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<ImportLogStatus> {
        match value {
            "processing" => Some(ImportLogStatus::Processing),
            "completed" => Some(ImportLogStatus::Completed),
            "failed" => Some(ImportLogStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ImportLogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// 批次状态机 (Batch State)
// ==========================================
// UPLOADED → PARSING → VALIDATING → RESOLVING → EXECUTING → {COMPLETED | FAILED}
// 文件级致命错误: PARSING → FAILED
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchState {
    Uploaded,
    Parsing,
    Validating,
    Resolving,
    Executing,
    Completed,
    Failed,
}

impl BatchState {
    /// 判断状态转换是否合法
    pub fn can_transition_to(self, next: BatchState) -> bool {
        use BatchState::*;
        matches!(
            (self, next),
            (Uploaded, Parsing)
                | (Parsing, Validating)
                | (Parsing, Failed)
                | (Validating, Resolving)
                | (Resolving, Executing)
                | (Executing, Completed)
                | (Executing, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed)
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BatchState::Uploaded => "UPLOADED",
            BatchState::Parsing => "PARSING",
            BatchState::Validating => "VALIDATING",
            BatchState::Resolving => "RESOLVING",
            BatchState::Executing => "EXECUTING",
            BatchState::Completed => "COMPLETED",
            BatchState::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_levels_follow_parent_chain() {
        assert_eq!(EntityType::Objective.parent(), None);
        for pair in EntityType::LEVELS.windows(2) {
            assert_eq!(pair[1].parent(), Some(pair[0]));
        }
        assert!(!EntityType::Objective.requires_parent());
        assert!(EntityType::Activity.requires_parent());
    }

    #[test]
    fn test_entity_status_parse_variants() {
        assert_eq!(EntityStatus::parse("In Progress"), Some(EntityStatus::InProgress));
        assert_eq!(EntityStatus::parse("not-started"), Some(EntityStatus::NotStarted));
        assert_eq!(EntityStatus::parse("COMPLETED"), Some(EntityStatus::Completed));
        assert_eq!(EntityStatus::parse("done"), None);
    }

    #[test]
    fn test_file_type_from_file_name() {
        assert_eq!(FileType::from_file_name("plan.XLSX"), Some(FileType::Xlsx));
        assert_eq!(FileType::from_file_name("plan.csv"), Some(FileType::Csv));
        assert_eq!(FileType::from_file_name("plan.pdf"), None);
        assert_eq!(FileType::from_file_name("noext"), None);
    }

    #[test]
    fn test_batch_state_transitions() {
        assert!(BatchState::Uploaded.can_transition_to(BatchState::Parsing));
        assert!(BatchState::Parsing.can_transition_to(BatchState::Failed));
        assert!(BatchState::Executing.can_transition_to(BatchState::Failed));
        assert!(!BatchState::Uploaded.can_transition_to(BatchState::Executing));
        assert!(!BatchState::Validating.can_transition_to(BatchState::Failed));
        assert!(!BatchState::Completed.can_transition_to(BatchState::Parsing));
        assert!(BatchState::Failed.is_terminal());
    }
}
