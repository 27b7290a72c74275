// ==========================================
// 层级导入 - 记录校验器
// ==========================================
// 职责: 按 type 选择校验规则，产出强类型记录或全部违规项
// 规则:
// - type ∈ {objective, initiative, activity}
// - initiative / activity 必须携带 parent_title
// - owner_email 邮箱格式
// - start_date / end_date 可解析，且 end_date > start_date
// - status 枚举，progress ∈ [0, 100]
// - title 长度 ≤ 255
// ==========================================

use crate::domain::import::{ImportRecord, NormalizedRecord, RowError};
use crate::domain::types::{EntityStatus, EntityType};
use crate::importer::error::ImportError;
use crate::importer::importer_trait::Validator;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

/// 标题最大长度（字符）
pub const MAX_TITLE_LEN: usize = 255;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is a valid regex")
});

/// 支持的日期格式
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

/// 解析日期文本
///
/// 支持 YYYY-MM-DD / YYYY/MM/DD / YYYYMMDD，以及 ISO 日期时间（取日期部分）
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Some(date);
        }
    }

    // 2024-01-15T00:00:00Z / 2024-01-15 08:30:00
    let (date_part, rest) = (value.get(..10)?, value.get(10..)?);
    if rest.starts_with('T') || rest.starts_with(' ') {
        return NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok();
    }
    None
}

/// 是否为合法邮箱
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

// ==========================================
// RecordValidator
// ==========================================
pub struct RecordValidator;

impl RecordValidator {
    pub fn new() -> Self {
        Self
    }

    fn parse_progress(raw: Option<&str>) -> Result<u8, ImportError> {
        let Some(raw) = raw else {
            return Ok(0);
        };

        let invalid = |message: &str| ImportError::FieldInvalid {
            field: "progress".to_string(),
            value: raw.to_string(),
            message: message.to_string(),
        };

        // 接受 "50" 与 "50.0"（表格数值单元格）
        let value: f64 = raw
            .trim()
            .parse()
            .map_err(|_| invalid(&format!("Progress must be an integer, got '{}'", raw)))?;
        if value.fract() != 0.0 {
            return Err(invalid(&format!("Progress must be an integer, got '{}'", raw)));
        }
        if !(0.0..=100.0).contains(&value) {
            return Err(invalid(&format!(
                "Progress must be between 0 and 100, got {}",
                raw
            )));
        }
        Ok(value as u8)
    }

    fn parse_date_field(field: &str, raw: &str) -> Result<NaiveDate, ImportError> {
        parse_date(raw).ok_or_else(|| ImportError::FieldInvalid {
            field: field.to_string(),
            value: raw.to_string(),
            message: format!("Invalid date for {}: '{}' (expected YYYY-MM-DD)", field, raw),
        })
    }
}

impl Default for RecordValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator for RecordValidator {
    fn validate(&self, record: NormalizedRecord) -> Result<ImportRecord, Vec<RowError>> {
        let row = record.row_number;
        let sheet = record.sheet.clone();
        let mut violations: Vec<(ImportError, String)> = Vec::new();

        // === type ===
        let raw_type = record.entity_type.clone().unwrap_or_default();
        let entity_type = EntityType::parse(&raw_type);
        if entity_type.is_none() {
            violations.push((
                ImportError::FieldInvalid {
                    field: "type".to_string(),
                    value: raw_type.clone(),
                    message: format!(
                        "Invalid type: '{}' (expected objective, initiative or activity)",
                        raw_type
                    ),
                },
                raw_type.clone(),
            ));
        }

        // === title ===
        if record.title.chars().count() > MAX_TITLE_LEN {
            violations.push((
                ImportError::FieldInvalid {
                    field: "title".to_string(),
                    value: record.title.clone(),
                    message: format!("Title exceeds {} characters", MAX_TITLE_LEN),
                },
                record.title.clone(),
            ));
        }

        // === parent_title ===
        let parent_title = record
            .parent_title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string);
        if entity_type.is_some_and(|t| t.requires_parent()) && parent_title.is_none() {
            violations.push((
                ImportError::FieldMissing {
                    field: "parent_title".to_string(),
                },
                String::new(),
            ));
        }

        // === owner_email ===
        if !is_valid_email(&record.owner_email) {
            violations.push((
                ImportError::FieldInvalid {
                    field: "owner_email".to_string(),
                    value: record.owner_email.clone(),
                    message: format!("Invalid email: '{}'", record.owner_email),
                },
                record.owner_email.clone(),
            ));
        }

        // === 日期 ===
        let start = match Self::parse_date_field("start_date", &record.start_date) {
            Ok(date) => Some(date),
            Err(err) => {
                violations.push((err, record.start_date.clone()));
                None
            }
        };
        let end = match Self::parse_date_field("end_date", &record.end_date) {
            Ok(date) => Some(date),
            Err(err) => {
                violations.push((err, record.end_date.clone()));
                None
            }
        };
        if let (Some(s), Some(e)) = (start, end) {
            if e <= s {
                violations.push((
                    ImportError::DateOrder {
                        start: record.start_date.clone(),
                        end: record.end_date.clone(),
                    },
                    record.end_date.clone(),
                ));
            }
        }

        // === status ===
        let status = EntityStatus::parse(&record.status);
        if status.is_none() {
            violations.push((
                ImportError::FieldInvalid {
                    field: "status".to_string(),
                    value: record.status.clone(),
                    message: format!(
                        "Invalid status: '{}' (expected not_started, in_progress, completed or paused)",
                        record.status
                    ),
                },
                record.status.clone(),
            ));
        }

        // === progress ===
        let progress = match Self::parse_progress(record.progress.as_deref()) {
            Ok(value) => Some(value),
            Err(err) => {
                violations.push((err, record.progress.clone().unwrap_or_default()));
                None
            }
        };

        match (entity_type, status, progress, start, end) {
            (Some(entity_type), Some(status), Some(progress), Some(start_date), Some(end_date))
                if violations.is_empty() =>
            {
                Ok(ImportRecord {
                    entity_type,
                    title: record.title,
                    description: record.description,
                    owner_email: record.owner_email.trim().to_lowercase(),
                    department: record.department,
                    status,
                    progress,
                    start_date,
                    end_date,
                    parent_title: if entity_type.requires_parent() {
                        parent_title
                    } else {
                        None
                    },
                    sheet: record.sheet,
                    row_number: row,
                })
            }
            _ => {
                tracing::warn!(
                    row = row,
                    sheet = sheet.as_deref().unwrap_or(""),
                    violations = violations.len(),
                    "记录校验失败"
                );
                Err(violations
                    .into_iter()
                    .map(|(err, data)| err.to_row_error(row, sheet.as_deref(), data))
                    .collect())
            }
        }
    }
}
