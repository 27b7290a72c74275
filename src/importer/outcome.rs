// ==========================================
// 层级导入 - 行级结果仓（Outcome Arena）
// ==========================================
// 职责: 以记录序号为下标保存每行的最终结果
// 约束: 序号 = 解析输出中的位置；不同工作表的行号可能重复，故不以行号为键
// ==========================================

use crate::domain::import::RowError;
use crate::domain::types::EntityType;

/// 单行结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Pending,
    Created { entity_type: EntityType, id: String },
    Failed(Vec<RowError>),
}

/// 结果槽（带来源信息）
#[derive(Debug, Clone)]
pub struct OutcomeSlot {
    pub sheet: Option<String>,
    pub row_number: usize,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Default)]
pub struct OutcomeArena {
    slots: Vec<OutcomeSlot>,
}

impl OutcomeArena {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// 登记一行，返回其序号
    pub fn push(&mut self, sheet: Option<String>, row_number: usize) -> usize {
        self.slots.push(OutcomeSlot {
            sheet,
            row_number,
            outcome: RecordOutcome::Pending,
        });
        self.slots.len() - 1
    }

    /// 标记失败；已失败的行追加错误
    pub fn fail(&mut self, ordinal: usize, errors: Vec<RowError>) {
        let Some(slot) = self.slots.get_mut(ordinal) else {
            return;
        };
        match &mut slot.outcome {
            RecordOutcome::Failed(existing) => existing.extend(errors),
            outcome => *outcome = RecordOutcome::Failed(errors),
        }
    }

    /// 标记创建成功
    pub fn created(&mut self, ordinal: usize, entity_type: EntityType, id: String) {
        if let Some(slot) = self.slots.get_mut(ordinal) {
            slot.outcome = RecordOutcome::Created { entity_type, id };
        }
    }

    pub fn get(&self, ordinal: usize) -> Option<&OutcomeSlot> {
        self.slots.get(ordinal)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn successful_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s.outcome, RecordOutcome::Created { .. }))
            .count()
    }

    /// 未成功创建的行都计为失败，保证 成功 + 失败 == 总数
    pub fn failed_count(&self) -> usize {
        self.len() - self.successful_count()
    }

    /// 按记录顺序展开全部行级错误
    pub fn errors(&self) -> Vec<RowError> {
        self.slots
            .iter()
            .filter_map(|s| match &s.outcome {
                RecordOutcome::Failed(errors) => Some(errors.iter().cloned()),
                _ => None,
            })
            .flatten()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::ErrorKind;

    fn row_error(row: usize, field: &str) -> RowError {
        RowError {
            row,
            sheet: None,
            field: field.to_string(),
            message: format!("bad {}", field),
            data: String::new(),
            kind: ErrorKind::FieldInvalid,
        }
    }

    #[test]
    fn test_counts_keep_invariant() {
        let mut arena = OutcomeArena::default();
        let a = arena.push(Some("Q1".to_string()), 2);
        let b = arena.push(Some("Q2".to_string()), 2);
        let _pending = arena.push(None, 3);

        arena.created(a, EntityType::Objective, "id-1".to_string());
        arena.fail(b, vec![row_error(2, "status")]);

        assert_eq!(arena.len(), 3);
        assert_eq!(arena.successful_count(), 1);
        assert_eq!(arena.failed_count(), 2);
        assert_eq!(arena.get(b).unwrap().sheet.as_deref(), Some("Q2"));
    }

    #[test]
    fn test_errors_flattened_in_record_order() {
        let mut arena = OutcomeArena::default();
        let first = arena.push(None, 2);
        let second = arena.push(None, 3);

        arena.fail(second, vec![row_error(3, "progress")]);
        arena.fail(first, vec![row_error(2, "type")]);
        arena.fail(second, vec![row_error(3, "parent_title")]);

        let fields: Vec<String> = arena.errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["type", "progress", "parent_title"]);
    }
}
