// ==========================================
// 层级导入 - 记录规范化
// ==========================================
// 职责: 任意表头 → 规范字段名；填充默认值；必填字段检查
// 规则: trim → 小写 → 空白替换为下划线 → 别名表
// ==========================================

use crate::domain::import::{ImportContext, NormalizedRecord, RawRow, RowError};
use crate::domain::types::EntityStatus;
use crate::importer::error::ImportError;
use crate::importer::importer_trait::RecordNormalizer;
use std::collections::HashMap;

/// 必填字段（缺失时整行在此阶段终止）
pub const REQUIRED_FIELDS: [&str; 4] = ["title", "owner_email", "start_date", "end_date"];

/// 表头规范化
///
/// "Owner Email" → "owner_email"，"Parent" → "parent_title"
pub fn canonical_field(header: &str) -> String {
    let key = header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_");

    let canonical = match key.as_str() {
        "name" => "title",
        "owner" | "email" => "owner_email",
        "parent" => "parent_title",
        "start" => "start_date",
        "end" | "due_date" => "end_date",
        "state" => "status",
        other => other,
    };
    canonical.to_string()
}

// ==========================================
// RecordNormalizerImpl
// ==========================================
pub struct RecordNormalizerImpl;

impl RecordNormalizerImpl {
    pub fn new() -> Self {
        Self
    }

    /// 部门回退顺序: 显式列 → 映射表[工作表] → 工作表名 → 空
    fn resolve_department(
        explicit: Option<String>,
        sheet: Option<&str>,
        ctx: &ImportContext,
    ) -> String {
        if let Some(dept) = explicit {
            return dept;
        }
        match sheet {
            Some(name) => ctx
                .department_mapping
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
            None => String::new(),
        }
    }
}

impl Default for RecordNormalizerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordNormalizer for RecordNormalizerImpl {
    fn normalize(
        &self,
        row: RawRow,
        ctx: &ImportContext,
    ) -> Result<NormalizedRecord, Vec<RowError>> {
        let RawRow {
            sheet,
            row_number,
            cells,
        } = row;

        // 表头排序后再映射，保证别名冲突时结果稳定（先出现的非空值优先）
        let mut cells: Vec<(String, String)> = cells.into_iter().collect();
        cells.sort_by(|a, b| a.0.cmp(&b.0));

        let mut fields: HashMap<String, String> = HashMap::new();
        for (header, value) in cells {
            let key = canonical_field(&header);
            if key.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            let occupied = fields.get(&key).is_some_and(|v| !v.is_empty());
            if !occupied {
                fields.insert(key, value);
            }
        }

        let missing: Vec<RowError> = REQUIRED_FIELDS
            .iter()
            .filter(|name| fields.get(**name).map_or(true, |v| v.is_empty()))
            .map(|name| {
                ImportError::FieldMissing {
                    field: name.to_string(),
                }
                .to_row_error(row_number, sheet.as_deref(), "")
            })
            .collect();

        if !missing.is_empty() {
            tracing::warn!(
                row = row_number,
                sheet = sheet.as_deref().unwrap_or(""),
                missing = missing.len(),
                "必填字段缺失，跳过该行"
            );
            return Err(missing);
        }

        let mut take = |name: &str| fields.remove(name).filter(|v| !v.is_empty());
        let department = Self::resolve_department(take("department"), sheet.as_deref(), ctx);

        Ok(NormalizedRecord {
            entity_type: take("type"),
            title: take("title").unwrap_or_default(),
            description: take("description").unwrap_or_default(),
            owner_email: take("owner_email").unwrap_or_default(),
            department,
            status: take("status")
                .unwrap_or_else(|| EntityStatus::default().as_str().to_string()),
            progress: take("progress"),
            start_date: take("start_date").unwrap_or_default(),
            end_date: take("end_date").unwrap_or_default(),
            parent_title: take("parent_title"),
            sheet,
            row_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::ErrorKind;

    fn raw_row(sheet: Option<&str>, pairs: &[(&str, &str)]) -> RawRow {
        RawRow {
            sheet: sheet.map(str::to_string),
            row_number: 2,
            cells: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_canonical_field_mapping() {
        assert_eq!(canonical_field("  Owner Email "), "owner_email");
        assert_eq!(canonical_field("Parent Title"), "parent_title");
        assert_eq!(canonical_field("Parent"), "parent_title");
        assert_eq!(canonical_field("Due Date"), "end_date");
        assert_eq!(canonical_field("Name"), "title");
        assert_eq!(canonical_field("progress"), "progress");
    }

    #[test]
    fn test_normalize_applies_defaults() {
        let normalizer = RecordNormalizerImpl::new();
        let ctx = ImportContext::new("tenant-a", "user-1");
        let row = raw_row(
            Some("Sales"),
            &[
                ("Type", "objective"),
                ("Title", "Grow Revenue"),
                ("Owner Email", "ana@example.com"),
                ("Start Date", "2024-01-01"),
                ("End Date", "2024-03-31"),
            ],
        );

        let record = normalizer.normalize(row, &ctx).unwrap();
        assert_eq!(record.title, "Grow Revenue");
        assert_eq!(record.status, "not_started");
        assert_eq!(record.department, "Sales");
        assert_eq!(record.description, "");
        assert!(record.progress.is_none());
        assert!(record.parent_title.is_none());
    }

    #[test]
    fn test_department_precedence() {
        let normalizer = RecordNormalizerImpl::new();
        let mut mapping = HashMap::new();
        mapping.insert("Q1".to_string(), "Marketing".to_string());
        let ctx = ImportContext::new("tenant-a", "user-1").with_department_mapping(mapping);

        let base = [
            ("title", "T"),
            ("owner_email", "a@b.co"),
            ("start_date", "2024-01-01"),
            ("end_date", "2024-01-02"),
        ];

        let mapped = normalizer.normalize(raw_row(Some("Q1"), &base), &ctx).unwrap();
        assert_eq!(mapped.department, "Marketing");

        let mut with_column = base.to_vec();
        with_column.push(("department", "Finance"));
        let explicit = normalizer
            .normalize(raw_row(Some("Q1"), &with_column), &ctx)
            .unwrap();
        assert_eq!(explicit.department, "Finance");

        let csv_row = normalizer.normalize(raw_row(None, &base), &ctx).unwrap();
        assert_eq!(csv_row.department, "");
    }

    #[test]
    fn test_missing_required_fields_reported_individually() {
        let normalizer = RecordNormalizerImpl::new();
        let ctx = ImportContext::new("tenant-a", "user-1");
        let row = raw_row(None, &[("title", "Write Copy"), ("start_date", "  ")]);

        let errors = normalizer.normalize(row, &ctx).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["owner_email", "start_date", "end_date"]);
        assert!(errors.iter().all(|e| e.kind == ErrorKind::FieldMissing && e.row == 2));
    }
}
