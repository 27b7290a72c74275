// ==========================================
// 层级导入 - 导入 API（上传边界）
// ==========================================
// 职责: 权限检查 → 文件大小检查 → 文件类型检查 → 运行导入管道
// 以及导入日志查询
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{ConfigManager, ImportConfigReader};
use crate::db::{init_schema, open_sqlite_connection};
use crate::domain::import::{DatePeriod, ImportContext, ImportLog, ImportRequest, ImportResult};
use crate::domain::types::FileType;
use crate::importer::{HierarchyImporter, HierarchyImporterImpl};
use crate::repository::{HierarchyRepositoryImpl, ImportLogRepositoryImpl};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 上传人身份
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Uploader {
    pub user_id: String,
    pub tenant_id: String,
    pub role: String,
}

/// 导入 API
pub struct ImportApi {
    conn: Arc<Mutex<Connection>>,
}

impl ImportApi {
    /// 从数据库路径创建（schema 幂等初始化）
    pub fn new(db_path: &str) -> ApiResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Ok(Self::from_connection(Arc::new(Mutex::new(conn))))
    }

    /// 从已有连接创建
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn config(&self) -> ApiResult<ConfigManager> {
        Ok(ConfigManager::from_connection(self.conn.clone())?)
    }

    fn create_importer(
        &self,
    ) -> ApiResult<HierarchyImporterImpl<HierarchyRepositoryImpl, ImportLogRepositoryImpl, ConfigManager>>
    {
        Ok(HierarchyImporterImpl::new(
            HierarchyRepositoryImpl::from_connection(self.conn.clone()),
            ImportLogRepositoryImpl::from_connection(self.conn.clone()),
            self.config()?,
        ))
    }

    /// 导入层级文件
    ///
    /// # 参数
    /// - uploader: 上传人（租户 / 角色）
    /// - file_name: 原始文件名（用于推断文件类型与审计）
    /// - bytes: 文件内容
    /// - period: 可选期间过滤
    ///
    /// # 返回
    /// - Ok(ImportResult): 管道结果（含文件级致命错误）
    /// - Err(ApiError): 权限 / 大小 / 类型检查未通过，或审计日志无法写入
    pub async fn import_file(
        &self,
        uploader: &Uploader,
        file_name: &str,
        bytes: Vec<u8>,
        period: Option<DatePeriod>,
    ) -> ApiResult<ImportResult> {
        let config = self.config()?;

        // 权限检查
        let roles = config.get_import_roles().await?;
        let role = uploader.role.trim().to_lowercase();
        if !roles.iter().any(|r| *r == role) {
            warn!(user_id = %uploader.user_id, role = %uploader.role, "无导入权限");
            return Err(ApiError::Forbidden {
                role: uploader.role.clone(),
                allowed: roles.join(","),
            });
        }

        // 文件大小检查
        let max_size = config.get_max_file_size_bytes().await?;
        if bytes.len() > max_size {
            warn!(file_name = %file_name, size = bytes.len(), max = max_size, "文件超出大小上限");
            return Err(ApiError::FileTooLarge {
                size: bytes.len(),
                max: max_size,
            });
        }

        // 文件类型检查
        let file_type = FileType::from_file_name(file_name)
            .ok_or_else(|| ApiError::UnsupportedFileType(file_name.to_string()))?;

        if let Some(p) = &period {
            if p.end < p.start {
                return Err(ApiError::InvalidInput(format!(
                    "period end {} is before start {}",
                    p.end, p.start
                )));
            }
        }

        let ctx = ImportContext::new(&uploader.tenant_id, &uploader.user_id)
            .with_department_mapping(config.get_department_mapping().await?);

        let request = ImportRequest {
            file_name: file_name.to_string(),
            file_type,
            bytes,
            period,
        };

        let importer = self.create_importer()?;
        let result = importer.import(&ctx, request).await?;

        info!(
            import_log_id = %result.import_log_id,
            successful = result.successful_records,
            failed = result.failed_records,
            "导入请求完成"
        );
        Ok(result)
    }

    /// 查询导入日志
    pub fn get_import_log(&self, log_id: &str) -> ApiResult<ImportLog> {
        let repo = ImportLogRepositoryImpl::from_connection(self.conn.clone());
        repo.find_by_id(log_id)?
            .ok_or_else(|| ApiError::NotFound(format!("ImportLog (id={})", log_id)))
    }

    /// 最近的导入日志（按创建时间倒序）
    pub fn list_import_logs(&self, tenant_id: &str, limit: usize) -> ApiResult<Vec<ImportLog>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit must be positive".to_string()));
        }
        let repo = ImportLogRepositoryImpl::from_connection(self.conn.clone());
        Ok(repo.list_recent(tenant_id, limit)?)
    }
}
