// ==========================================
// 层级导入 - 导入执行器
// ==========================================
// 职责: 按层级顺序逐条落库，逐行记录结果
// 策略: 非事务化；单条失败不回滚、不阻塞后续记录
// ==========================================

use crate::domain::import::{ImportContext, ImportRecord, RowError};
use crate::domain::types::EntityType;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::hierarchy_resolver::HierarchyResolver;
use crate::importer::outcome::OutcomeArena;
use crate::repository::HierarchyRepository;
use tracing::{debug, info, warn};

/// 待执行记录（已通过校验与负责人解析）
#[derive(Debug, Clone)]
pub struct QueuedRecord {
    pub ordinal: usize,
    pub record: ImportRecord,
    pub owner_id: Option<String>,
    pub errors: Vec<RowError>, // 前序阶段的非阻断错误（如负责人未找到）
}

/// 单层级执行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelSummary {
    pub created: usize,
    pub failed: usize,
}

// ==========================================
// ImportExecutor
// ==========================================
pub struct ImportExecutor<'a, R: HierarchyRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: HierarchyRepository + ?Sized> ImportExecutor<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// 创建单条实体
    ///
    /// # 参数
    /// - parent_id: Objective 传 None
    ///
    /// # 返回
    /// - Err(Database): 落库失败（仅影响本行）
    pub async fn create(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        parent_id: Option<&str>,
    ) -> ImporterResult<String> {
        let result = match (record.entity_type, parent_id) {
            (EntityType::Objective, _) => self.repo.create_objective(ctx, record, owner_id).await,
            (EntityType::Initiative, Some(objective_id)) => {
                self.repo
                    .create_initiative(ctx, record, owner_id, objective_id)
                    .await
            }
            (EntityType::Activity, Some(initiative_id)) => {
                self.repo
                    .create_activity(ctx, record, owner_id, initiative_id)
                    .await
            }
            (entity_type, None) => {
                return Err(ImportError::Database {
                    entity_type,
                    message: "parent id is required".to_string(),
                })
            }
        };

        result.map_err(|e| ImportError::Database {
            entity_type: record.entity_type,
            message: e.to_string(),
        })
    }

    /// 按层级顺序执行
    ///
    /// 每一层先用前序层级的查找表解析父级，再逐条创建；创建成功的实体登记到查找表供下一层使用
    pub async fn execute(
        &self,
        ctx: &ImportContext,
        resolver: &mut HierarchyResolver<'_, R>,
        queue: Vec<QueuedRecord>,
        arena: &mut OutcomeArena,
    ) -> Vec<(EntityType, LevelSummary)> {
        let mut queue: Vec<Option<QueuedRecord>> = queue.into_iter().map(Some).collect();
        let mut summaries = Vec::with_capacity(EntityType::LEVELS.len());

        for level in EntityType::LEVELS {
            debug!(level = %level, "开始执行层级");
            let mut summary = LevelSummary::default();

            for slot in queue.iter_mut() {
                if slot.as_ref().map(|q| q.record.entity_type) != Some(level) {
                    continue;
                }
                let Some(queued) = slot.take() else {
                    continue;
                };

                match self.execute_one(ctx, resolver, queued, arena).await {
                    true => summary.created += 1,
                    false => summary.failed += 1,
                }
            }

            info!(
                level = %level,
                created = summary.created,
                failed = summary.failed,
                "层级执行完成"
            );
            summaries.push((level, summary));
        }

        summaries
    }

    /// 执行单条记录，返回是否创建成功
    async fn execute_one(
        &self,
        ctx: &ImportContext,
        resolver: &mut HierarchyResolver<'_, R>,
        queued: QueuedRecord,
        arena: &mut OutcomeArena,
    ) -> bool {
        let QueuedRecord {
            ordinal,
            record,
            owner_id,
            mut errors,
        } = queued;
        let row = record.row_number;
        let sheet = record.sheet.as_deref();

        let parent_id = match resolver.resolve_parent(&record).await {
            Ok(parent_id) => parent_id,
            Err(err) => {
                let data = record.parent_title.clone().unwrap_or_default();
                errors.push(err.to_row_error(row, sheet, data));
                None
            }
        };

        let owner_id = match owner_id {
            Some(owner_id) if errors.is_empty() => owner_id,
            _ => {
                warn!(row = row, title = %record.title, errors = errors.len(), "记录未能解析，跳过创建");
                arena.fail(ordinal, errors);
                return false;
            }
        };

        match self
            .create(ctx, &record, &owner_id, parent_id.as_deref())
            .await
        {
            Ok(id) => {
                resolver.register_created(record.entity_type, &record.title, id.clone());
                arena.created(ordinal, record.entity_type, id);
                true
            }
            Err(err) => {
                warn!(row = row, title = %record.title, error = %err, "落库失败");
                arena.fail(ordinal, vec![err.to_row_error(row, sheet, record.title.clone())]);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{configure_sqlite_connection, init_schema};
    use crate::domain::types::EntityStatus;
    use crate::repository::HierarchyRepositoryImpl;
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn setup_repo() -> (HierarchyRepositoryImpl, String) {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        let repo = HierarchyRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)));
        let owner = repo.insert_profile("tenant-a", "owner@acme.test", None).unwrap();
        (repo, owner)
    }

    fn queued(
        ordinal: usize,
        entity_type: EntityType,
        title: &str,
        parent: Option<&str>,
        owner: &str,
    ) -> QueuedRecord {
        QueuedRecord {
            ordinal,
            record: ImportRecord {
                entity_type,
                title: title.to_string(),
                description: String::new(),
                owner_email: "owner@acme.test".to_string(),
                department: String::new(),
                status: EntityStatus::NotStarted,
                progress: 0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                parent_title: parent.map(str::to_string),
                sheet: None,
                row_number: ordinal + 2,
            },
            owner_id: Some(owner.to_string()),
            errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_execute_reports_level_summaries() {
        let (repo, owner) = setup_repo();
        let ctx = ImportContext::new("tenant-a", "uploader-1");
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");
        let mut arena = OutcomeArena::with_capacity(3);
        for ordinal in 0..3 {
            arena.push(None, ordinal + 2);
        }

        // 活动排在前面，仍在举措之后执行
        let queue = vec![
            queued(0, EntityType::Activity, "Write Copy", Some("Launch Campaign"), &owner),
            queued(1, EntityType::Objective, "Grow Revenue", None, &owner),
            queued(2, EntityType::Initiative, "Orphan", Some("Missing Goal"), &owner),
        ];

        let summaries = ImportExecutor::new(&repo)
            .execute(&ctx, &mut resolver, queue, &mut arena)
            .await;

        assert_eq!(
            summaries,
            vec![
                (EntityType::Objective, LevelSummary { created: 1, failed: 0 }),
                (EntityType::Initiative, LevelSummary { created: 0, failed: 1 }),
                (EntityType::Activity, LevelSummary { created: 0, failed: 1 }),
            ]
        );
        assert_eq!(arena.successful_count(), 1);
        assert_eq!(arena.failed_count(), 2);
    }
}
