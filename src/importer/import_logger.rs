// ==========================================
// 层级导入 - 导入审计日志
// ==========================================
// 职责: 执行前创建 processing 日志，执行后一次性写入终态
// 终态: 零错误 → completed；存在任何错误（含部分成功）→ failed
// ==========================================

use crate::domain::import::{ImportContext, ImportRequest, NewImportLog, RowError};
use crate::domain::types::ImportLogStatus;
use crate::importer::error::ImporterResult;
use crate::repository::ImportLogRepository;
use tracing::{debug, info};

pub struct ImportLogger<'a, L: ImportLogRepository + ?Sized> {
    repo: &'a L,
}

impl<'a, L: ImportLogRepository + ?Sized> ImportLogger<'a, L> {
    pub fn new(repo: &'a L) -> Self {
        Self { repo }
    }

    /// 创建 processing 状态日志
    ///
    /// # 返回
    /// - Ok(log_id)
    pub async fn begin(
        &self,
        ctx: &ImportContext,
        request: &ImportRequest,
        total_records: usize,
    ) -> ImporterResult<String> {
        let log_id = self
            .repo
            .create(&NewImportLog {
                tenant_id: ctx.tenant_id.clone(),
                uploaded_by: ctx.uploader_id.clone(),
                file_name: request.file_name.clone(),
                file_type: request.file_type,
                total_records,
            })
            .await?;

        debug!(log_id = %log_id, total_records = total_records, "导入日志已创建");
        Ok(log_id)
    }

    /// 写入终态
    ///
    /// # 返回
    /// - Ok(status): 实际写入的终态
    pub async fn finish(
        &self,
        log_id: &str,
        successful_records: usize,
        failed_records: usize,
        errors: &[RowError],
    ) -> ImporterResult<ImportLogStatus> {
        let status = Self::final_status(errors);
        self.repo
            .update(log_id, status, successful_records, failed_records, errors)
            .await?;

        info!(
            log_id = %log_id,
            status = %status,
            successful = successful_records,
            failed = failed_records,
            "导入日志已更新"
        );
        Ok(status)
    }

    pub fn final_status(errors: &[RowError]) -> ImportLogStatus {
        if errors.is_empty() {
            ImportLogStatus::Completed
        } else {
            ImportLogStatus::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import::ErrorKind;
    use crate::domain::types::FileType;
    use crate::repository::ImportLogRepositoryImpl;
    use rusqlite::Connection;
    use std::sync::{Arc, Mutex};

    fn setup_repo() -> ImportLogRepositoryImpl {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ImportLogRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    fn request() -> ImportRequest {
        ImportRequest {
            file_name: "plan.csv".to_string(),
            file_type: FileType::Csv,
            bytes: Vec::new(),
            period: None,
        }
    }

    #[tokio::test]
    async fn test_partial_success_marks_failed() {
        let repo = setup_repo();
        let logger = ImportLogger::new(&repo);
        let ctx = ImportContext::new("tenant-a", "user-1");

        let log_id = logger.begin(&ctx, &request(), 3).await.unwrap();
        let errors = vec![RowError {
            row: 4,
            sheet: None,
            field: "parent_title".to_string(),
            message: "Parent initiative not found: Launch Campain".to_string(),
            data: "Launch Campain".to_string(),
            kind: ErrorKind::ParentNotFound,
        }];

        let status = logger.finish(&log_id, 2, 1, &errors).await.unwrap();
        assert_eq!(status, ImportLogStatus::Failed);

        let log = repo.find_by_id(&log_id).unwrap().unwrap();
        assert_eq!(log.uploaded_by, "user-1");
        assert_eq!(log.total_records, 3);
        assert_eq!(log.successful_records, 2);
        assert_eq!(log.status, ImportLogStatus::Failed);
    }

    #[tokio::test]
    async fn test_zero_errors_marks_completed() {
        let repo = setup_repo();
        let logger = ImportLogger::new(&repo);
        let ctx = ImportContext::new("tenant-a", "user-1");

        let log_id = logger.begin(&ctx, &request(), 0).await.unwrap();
        let status = logger.finish(&log_id, 0, 0, &[]).await.unwrap();
        assert_eq!(status, ImportLogStatus::Completed);
    }
}
