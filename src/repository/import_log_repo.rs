// ==========================================
// 层级导入 - 导入日志数据仓储
// ==========================================
// 职责: 导入批次的审计记录（创建一次、终态更新一次、从不删除）
// 对齐: db.rs import_logs 表
// ==========================================

mod core;
mod queries;


pub use core::ImportLogRepositoryImpl;

use crate::domain::import::{NewImportLog, RowError};
use crate::domain::types::ImportLogStatus;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// ImportLogRepository Trait
// ==========================================
// 用途: ImportLogger 的持久化协作方
// 实现者: ImportLogRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait ImportLogRepository: Send + Sync {
    /// 创建 status=processing 的导入日志
    ///
    /// # 返回
    /// - Ok(log_id): 新日志 ID
    async fn create(&self, log: &NewImportLog) -> RepositoryResult<String>;

    /// 写入终态（仅允许从 processing 更新一次）
    async fn update(
        &self,
        log_id: &str,
        status: ImportLogStatus,
        successful_records: usize,
        failed_records: usize,
        errors: &[RowError],
    ) -> RepositoryResult<()>;
}
