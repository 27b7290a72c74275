// ==========================================
// 层级导入 - 层级实体 Repository 实现
// ==========================================
// 职责: 实现层级实体创建/查找（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::import::{ImportContext, ImportRecord};
use crate::domain::types::EntityType;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::hierarchy_repo::HierarchyRepository;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

/// 层级类型 → 表名
fn table_name(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Objective => "objectives",
        EntityType::Initiative => "initiatives",
        EntityType::Activity => "activities",
    }
}

/// 层级类型 → 父级外键列
fn parent_column(entity_type: EntityType) -> Option<&'static str> {
    match entity_type {
        EntityType::Objective => None,
        EntityType::Initiative => Some("objective_id"),
        EntityType::Activity => Some("initiative_id"),
    }
}

// ==========================================
// HierarchyRepositoryImpl
// ==========================================
pub struct HierarchyRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl HierarchyRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建（与其他仓储共享连接）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入一条层级实体
    fn insert_entity(
        &self,
        entity_type: EntityType,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        parent_id: Option<&str>,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let id = Uuid::new_v4().to_string();
        let table = table_name(entity_type);

        match (parent_column(entity_type), parent_id) {
            (None, _) => {
                conn.execute(
                    &format!(
                        r#"
                        INSERT INTO {table} (
                            id, tenant_id, title, description, owner_id, department,
                            status, progress, start_date, end_date, created_by, created_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                        "#
                    ),
                    params![
                        id,
                        ctx.tenant_id,
                        record.title,
                        record.description,
                        owner_id,
                        record.department,
                        record.status.as_str(),
                        record.progress,
                        record.start_date.format("%Y-%m-%d").to_string(),
                        record.end_date.format("%Y-%m-%d").to_string(),
                        ctx.uploader_id,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
            }
            (Some(column), Some(parent_id)) => {
                conn.execute(
                    &format!(
                        r#"
                        INSERT INTO {table} (
                            id, tenant_id, {column}, title, description, owner_id, department,
                            status, progress, start_date, end_date, created_by, created_at
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
                        "#
                    ),
                    params![
                        id,
                        ctx.tenant_id,
                        parent_id,
                        record.title,
                        record.description,
                        owner_id,
                        record.department,
                        record.status.as_str(),
                        record.progress,
                        record.start_date.format("%Y-%m-%d").to_string(),
                        record.end_date.format("%Y-%m-%d").to_string(),
                        ctx.uploader_id,
                        Utc::now().to_rfc3339(),
                    ],
                )?;
            }
            (Some(column), None) => {
                return Err(RepositoryError::FieldValueError {
                    field: column.to_string(),
                    value: String::new(),
                });
            }
        }

        Ok(id)
    }

    // ==========================================
    // 负责人档案（供初始化/测试使用）
    // ==========================================

    /// 插入负责人档案
    pub fn insert_profile(
        &self,
        tenant_id: &str,
        email: &str,
        full_name: Option<&str>,
    ) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            "INSERT INTO profiles (id, tenant_id, email, full_name) VALUES (?1, ?2, ?3, ?4)",
            params![id, tenant_id, email.trim().to_lowercase(), full_name],
        )?;

        Ok(id)
    }

    /// 统计租户下某层级的实体数量
    pub fn count_entities(&self, entity_type: EntityType, tenant_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE tenant_id = ?1", table_name(entity_type)),
            params![tenant_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// 查询实体的父级 ID（Objective 返回 None）
    pub fn find_parent_id(
        &self,
        entity_type: EntityType,
        id: &str,
    ) -> RepositoryResult<Option<String>> {
        let Some(column) = parent_column(entity_type) else {
            return Ok(None);
        };

        let conn = self.get_conn()?;
        let parent = conn
            .query_row(
                &format!("SELECT {column} FROM {} WHERE id = ?1", table_name(entity_type)),
                params![id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(parent)
    }
}

#[async_trait]
impl HierarchyRepository for HierarchyRepositoryImpl {
    async fn create_objective(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
    ) -> RepositoryResult<String> {
        self.insert_entity(EntityType::Objective, ctx, record, owner_id, None)
    }

    async fn create_initiative(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        objective_id: &str,
    ) -> RepositoryResult<String> {
        self.insert_entity(EntityType::Initiative, ctx, record, owner_id, Some(objective_id))
    }

    async fn create_activity(
        &self,
        ctx: &ImportContext,
        record: &ImportRecord,
        owner_id: &str,
        initiative_id: &str,
    ) -> RepositoryResult<String> {
        self.insert_entity(EntityType::Activity, ctx, record, owner_id, Some(initiative_id))
    }

    async fn find_id_by_title(
        &self,
        entity_type: EntityType,
        title: &str,
        tenant_id: &str,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                &format!(
                    "SELECT id FROM {} WHERE tenant_id = ?1 AND title = ?2
                     ORDER BY created_at DESC, rowid DESC LIMIT 1",
                    table_name(entity_type)
                ),
                params![tenant_id, title],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }

    async fn find_profile_id_by_email(
        &self,
        email: &str,
        tenant_id: &str,
    ) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let id = conn
            .query_row(
                "SELECT id FROM profiles WHERE tenant_id = ?1 AND lower(email) = lower(?2) LIMIT 1",
                params![tenant_id, email.trim()],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(id)
    }
}
