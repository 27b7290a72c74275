// ==========================================
// 层级导入 - 层级实体 Repository Trait
// ==========================================
// 职责: 定义解析/执行阶段所需的创建与查找接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// 约束: 所有查找与创建均按 tenant 隔离
// ==========================================

use crate::domain::import::{ImportContext, ImportRecord};
use crate::domain::types::EntityType;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// HierarchyRepository Trait
// ==========================================
// 用途: HierarchyResolver / ImportExecutor 的持久化协作方
// 实现者: HierarchyRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait HierarchyRepository: Send + Sync {
    /// 创建战略目标
    ///
    /// # 返回
    /// - Ok(id): 新实体 ID
    async fn create_objective(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
    ) -> RepositoryResult<String>;

    /// 创建举措（挂在目标下）
    async fn create_initiative(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        objective_id: &str,
    ) -> RepositoryResult<String>;

    /// 创建活动（挂在举措下）
    async fn create_activity(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        initiative_id: &str,
    ) -> RepositoryResult<String>;

    /// 按标题查找已存在的实体
    ///
    /// # 返回
    /// - Ok(Some(id)): 找到（同标题多条时取最近创建的一条）
    /// - Ok(None): 未找到
    async fn find_id_by_title(
        &self,
        entity_type: EntityType,
        title: &str,
        tenant_id: &str,
    ) -> RepositoryResult<Option<String>>;

    /// 按邮箱查找负责人档案（大小写不敏感）
    async fn find_profile_id_by_email(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> RepositoryResult<Option<String>>;
}
