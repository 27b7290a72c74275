use super::ImportLogRepository;
use crate::db::open_sqlite_connection;
use crate::domain::import::{NewImportLog, RowError};
use crate::domain::types::ImportLogStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

// ==========================================
// ImportLogRepositoryImpl - 导入日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ImportLogRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ImportLogRepositoryImpl {
    /// 从数据库路径创建
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入 processing 状态的日志
    pub fn insert(&self, log: &NewImportLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let id = Uuid::new_v4().to_string();

        conn.execute(
            r#"
            INSERT INTO import_logs (
                id, tenant_id, uploaded_by, file_name, file_type, status,
                total_records, successful_records, failed_records, errors_json, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, 0, '[]', ?8)
            "#,
            params![
                id,
                log.tenant_id,
                log.uploaded_by,
                log.file_name,
                log.file_type.as_str(),
                ImportLogStatus::Processing.as_str(),
                log.total_records as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(id)
    }

    /// 写入终态
    ///
    /// # 返回
    /// - Err(NotFound): 日志不存在
    /// - Err(InvalidStateTransition): 日志已是终态或目标状态非终态
    pub fn finish(
        &self,
        log_id: &str,
        status: ImportLogStatus,
        successful_records: usize,
        failed_records: usize,
        errors: &[RowError],
    ) -> RepositoryResult<()> {
        if status == ImportLogStatus::Processing {
            return Err(RepositoryError::InvalidStateTransition {
                from: ImportLogStatus::Processing.to_string(),
                to: status.to_string(),
            });
        }

        let errors_json = serde_json::to_string(errors)?;
        let conn = self.get_conn()?;

        let current: Option<String> = conn
            .query_row(
                "SELECT status FROM import_logs WHERE id = ?1",
                params![log_id],
                |row| row.get(0),
            )
            .optional()?;

        match current.as_deref() {
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "import_log".to_string(),
                    id: log_id.to_string(),
                })
            }
            Some(s) if s != ImportLogStatus::Processing.as_str() => {
                return Err(RepositoryError::InvalidStateTransition {
                    from: s.to_string(),
                    to: status.to_string(),
                })
            }
            Some(_) => {}
        }

        conn.execute(
            r#"
            UPDATE import_logs
            SET status = ?1, successful_records = ?2, failed_records = ?3,
                errors_json = ?4, completed_at = ?5
            WHERE id = ?6
            "#,
            params![
                status.as_str(),
                successful_records as i64,
                failed_records as i64,
                errors_json,
                Utc::now().to_rfc3339(),
                log_id,
            ],
        )?;

        Ok(())
    }
}

#[async_trait]
impl ImportLogRepository for ImportLogRepositoryImpl {
    async fn create(&self, log: &NewImportLog) -> RepositoryResult<String> {
        self.insert(log)
    }

    async fn update(
        &self,
        log_id: &str,
        status: ImportLogStatus,
        successful_records: usize,
        failed_records: usize,
        errors: &[RowError],
    ) -> RepositoryResult<()> {
        self.finish(log_id, status, successful_records, failed_records, errors)
    }
}
