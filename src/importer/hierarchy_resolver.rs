// ==========================================
// 层级导入 - 层级解析器
// ==========================================
// 职责: 标题 → ID 的父级解析；负责人邮箱解析
// 规则:
// - 查找表 = 本批已创建实体（同标题后者覆盖）+ 租户既有实体（按需查询）
// - 本批创建的实体优先于既有实体
// - 负责人查询结果在单批内缓存
// ==========================================

use crate::domain::import::{ImportRecord, ImportWarning, WarningKind};
use crate::domain::types::EntityType;
use crate::importer::error::{ImportError, ImporterResult};
use crate::repository::HierarchyRepository;
use std::collections::HashMap;

// ==========================================
// LevelLookup - 单层级 title → id 查找表
// ==========================================
#[derive(Debug, Default)]
pub struct LevelLookup {
    created: HashMap<String, String>,          // 本批创建
    existing: HashMap<String, Option<String>>, // 既有实体查询缓存（含未命中）
}

impl LevelLookup {
    /// 登记新建实体（覆盖同标题旧值）
    pub fn insert_created(&mut self, title: &str, id: String) {
        self.created.insert(title.trim().to_string(), id);
    }

    pub fn created_id(&self, title: &str) -> Option<&str> {
        self.created.get(title.trim()).map(String::as_str)
    }
}

// ==========================================
// HierarchyResolver
// ==========================================
pub struct HierarchyResolver<'a, R: HierarchyRepository + ?Sized> {
    repo: &'a R,
    tenant_id: &'a str,
    owners: HashMap<String, Option<String>>,
    lookups: HashMap<EntityType, LevelLookup>,
}

impl<'a, R: HierarchyRepository + ?Sized> HierarchyResolver<'a, R> {
    pub fn new(repo: &'a R, tenant_id: &'a str) -> Self {
        Self {
            repo,
            tenant_id,
            owners: HashMap::new(),
            lookups: HashMap::new(),
        }
    }

    /// 解析负责人邮箱 → 档案 ID
    ///
    /// # 返回
    /// - Ok(id): 找到
    /// - Err(OwnerNotFound): 租户下无此邮箱
    /// - Err(Repository): 查询失败
    pub async fn resolve_owner(&mut self, email: &str) -> ImporterResult<String> {
        let key = email.trim().to_lowercase();

        let found = match self.owners.get(&key) {
            Some(cached) => cached.clone(),
            None => {
                let found = self
                    .repo
                    .find_profile_id_by_email(&key, self.tenant_id)
                    .await?;
                self.owners.insert(key.clone(), found.clone());
                found
            }
        };

        found.ok_or(ImportError::OwnerNotFound {
            email: email.to_string(),
        })
    }

    /// 解析父级 ID
    ///
    /// # 返回
    /// - Ok(None): 顶层记录，无父级
    /// - Ok(Some(id)): 父级 ID
    /// - Err(ParentNotFound): 本批与既有实体均无此标题
    pub async fn resolve_parent(&mut self, record: &ImportRecord) -> ImporterResult<Option<String>> {
        let Some(parent_type) = record.entity_type.parent() else {
            return Ok(None);
        };

        let title = record.parent_title.as_deref().unwrap_or("").trim();
        let not_found = || ImportError::ParentNotFound {
            parent_type,
            title: title.to_string(),
        };
        if title.is_empty() {
            return Err(not_found());
        }

        let lookup = self.lookups.entry(parent_type).or_default();
        if let Some(id) = lookup.created_id(title) {
            return Ok(Some(id.to_string()));
        }

        let existing = match lookup.existing.get(title) {
            Some(cached) => cached.clone(),
            None => {
                let found = self
                    .repo
                    .find_id_by_title(parent_type, title, self.tenant_id)
                    .await?;
                lookup.existing.insert(title.to_string(), found.clone());
                found
            }
        };

        existing.map(Some).ok_or_else(not_found)
    }

    /// 登记本批新建实体，供下一层级解析
    pub fn register_created(&mut self, entity_type: EntityType, title: &str, id: String) {
        self.lookups
            .entry(entity_type)
            .or_default()
            .insert_created(title, id);
    }

    pub fn lookup(&self, entity_type: EntityType) -> Option<&LevelLookup> {
        self.lookups.get(&entity_type)
    }
}

/// 同层级重复标题检查
///
/// 后出现的记录覆盖查找表，对后者给出提示
pub fn detect_duplicate_titles<'r>(
    records: impl IntoIterator<Item = &'r ImportRecord>,
) -> Vec<ImportWarning> {
    let mut seen: HashMap<(EntityType, String), (usize, Option<String>)> = HashMap::new();
    let mut warnings = Vec::new();

    for record in records {
        let key = (record.entity_type, record.title.trim().to_string());
        if let Some((first_row, first_sheet)) = seen.get(&key) {
            let location = match first_sheet {
                Some(sheet) => format!("{} row {}", sheet, first_row),
                None => format!("row {}", first_row),
            };
            warnings.push(ImportWarning {
                row: record.row_number,
                sheet: record.sheet.clone(),
                kind: WarningKind::DuplicateTitle,
                message: format!(
                    "Duplicate {} title '{}' (also on {}); the last one is used when resolving parents",
                    record.entity_type, key.1, location
                ),
            });
        } else {
            seen.insert(key, (record.row_number, record.sheet.clone()));
        }
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::ImportContext;
    use crate::domain::types::EntityStatus;
    use crate::repository::error::RepositoryResult;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::sync::Mutex;

    /// 内存仓储：记录查询次数
    #[derive(Default)]
    struct StubRepo {
        existing: HashMap<(EntityType, String), String>,
        profiles: HashMap<String, String>,
        title_queries: Mutex<usize>,
        email_queries: Mutex<usize>,
    }

    #[async_trait]
    impl HierarchyRepository for StubRepo {
        async fn create_objective(
            &self,
            _ctx: &ImportContext,
            _record: &ImportRecord,
            _owner_id: &str,
        ) -> RepositoryResult<String> {
            unreachable!()
        }

        async fn create_initiative(
            &self,
            _ctx: &ImportContext,
            _record: &ImportRecord,
            _owner_id: &str,
            _objective_id: &str,
        ) -> RepositoryResult<String> {
            unreachable!()
        }

        async fn create_activity(
            &self,
            _ctx: &ImportContext,
            _record: &ImportRecord,
            _owner_id: &str,
            _initiative_id: &str,
        ) -> RepositoryResult<String> {
            unreachable!()
        }

        async fn find_id_by_title(
            &self,
            entity_type: EntityType,
            title: &str,
            _tenant_id: &str,
        ) -> RepositoryResult<Option<String>> {
            *self.title_queries.lock().unwrap() += 1;
            Ok(self.existing.get(&(entity_type, title.to_string())).cloned())
        }

        async fn find_profile_id_by_email(
            &self,
            email: &str,
            _tenant_id: &str,
        ) -> RepositoryResult<Option<String>> {
            *self.email_queries.lock().unwrap() += 1;
            Ok(self.profiles.get(email).cloned())
        }
    }

    fn record(entity_type: EntityType, title: &str, parent: Option<&str>, row: usize) -> ImportRecord {
        ImportRecord {
            entity_type,
            title: title.to_string(),
            description: String::new(),
            owner_email: "ana@example.com".to_string(),
            department: String::new(),
            status: EntityStatus::NotStarted,
            progress: 0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            parent_title: parent.map(str::to_string),
            sheet: None,
            row_number: row,
        }
    }

    #[tokio::test]
    async fn test_owner_lookup_cached() {
        let mut repo = StubRepo::default();
        repo.profiles
            .insert("ana@example.com".to_string(), "profile-1".to_string());
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");

        assert_eq!(resolver.resolve_owner("Ana@Example.com").await.unwrap(), "profile-1");
        assert_eq!(resolver.resolve_owner("ana@example.com").await.unwrap(), "profile-1");
        let missing = resolver.resolve_owner("nobody@example.com").await.unwrap_err();
        assert_eq!(missing.to_string(), "Owner not found: nobody@example.com");
        resolver.resolve_owner("nobody@example.com").await.unwrap_err();

        assert_eq!(*repo.email_queries.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_batch_created_parent_wins_over_existing() {
        let mut repo = StubRepo::default();
        repo.existing.insert(
            (EntityType::Objective, "Grow Revenue".to_string()),
            "old-objective".to_string(),
        );
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");
        let initiative = record(EntityType::Initiative, "Launch", Some("Grow Revenue"), 3);

        assert_eq!(
            resolver.resolve_parent(&initiative).await.unwrap().as_deref(),
            Some("old-objective")
        );

        resolver.register_created(EntityType::Objective, "Grow Revenue", "new-objective".to_string());
        assert_eq!(
            resolver.resolve_parent(&initiative).await.unwrap().as_deref(),
            Some("new-objective")
        );
    }

    #[tokio::test]
    async fn test_missing_parent_reports_parent_level() {
        let repo = StubRepo::default();
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");
        let activity = record(EntityType::Activity, "Write Copy", Some("Launch Campain"), 4);

        let err = resolver.resolve_parent(&activity).await.unwrap_err();
        assert_eq!(err.to_string(), "Parent initiative not found: Launch Campain");

        // 未命中结果同样缓存
        resolver.resolve_parent(&activity).await.unwrap_err();
        assert_eq!(*repo.title_queries.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_objective_has_no_parent() {
        let repo = StubRepo::default();
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");
        let objective = record(EntityType::Objective, "Grow Revenue", None, 2);
        assert_eq!(resolver.resolve_parent(&objective).await.unwrap(), None);
    }

    #[test]
    fn test_last_created_title_overwrites() {
        let repo = StubRepo::default();
        let mut resolver = HierarchyResolver::new(&repo, "tenant-a");
        resolver.register_created(EntityType::Objective, "Grow Revenue", "first".to_string());
        resolver.register_created(EntityType::Objective, "Grow Revenue", "second".to_string());

        let lookup = resolver.lookup(EntityType::Objective).unwrap();
        assert_eq!(lookup.created_id("Grow Revenue"), Some("second"));
    }

    #[test]
    fn test_detect_duplicate_titles_per_level() {
        let records = vec![
            record(EntityType::Objective, "Grow Revenue", None, 2),
            record(EntityType::Initiative, "Grow Revenue", Some("Grow Revenue"), 3),
            record(EntityType::Objective, "Grow Revenue", None, 5),
        ];

        let warnings = detect_duplicate_titles(&records);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].row, 5);
        assert_eq!(warnings[0].kind, WarningKind::DuplicateTitle);
        assert!(warnings[0].message.contains("row 2"));
    }
}
