// ==========================================
// 层级导入 - 导入管道实现
// ==========================================
// 职责: 串联 解析 → 规范化 → 校验 → 层级解析 → 执行 → 审计日志
// 状态机: UPLOADED → PARSING → VALIDATING → RESOLVING → EXECUTING → {COMPLETED | FAILED}
//         文件级致命错误: PARSING → FAILED
// 单次请求内顺序执行，无批内并发
// ==========================================

use crate::config::{ImportConfigReader, DEFAULT_MAX_RECORDS};
use crate::domain::import::{ImportContext, ImportRecord, ImportRequest, ImportResult};
use crate::domain::types::BatchState;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::hierarchy_resolver::{detect_duplicate_titles, HierarchyResolver};
use crate::importer::import_executor::{ImportExecutor, QueuedRecord};
use crate::importer::import_logger::ImportLogger;
use crate::importer::importer_trait::{HierarchyImporter, RecordNormalizer, Validator};
use crate::importer::outcome::OutcomeArena;
use crate::importer::record_normalizer::RecordNormalizerImpl;
use crate::importer::validator::RecordValidator;
use crate::repository::{HierarchyRepository, ImportLogRepository};
use async_trait::async_trait;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

// ==========================================
// BatchTracker - 批次状态机
// ==========================================
#[derive(Debug)]
pub struct BatchTracker {
    state: BatchState,
}

impl BatchTracker {
    pub fn new() -> Self {
        Self {
            state: BatchState::Uploaded,
        }
    }

    pub fn state(&self) -> BatchState {
        self.state
    }

    /// 状态推进；非法转换返回错误
    pub fn advance(&mut self, next: BatchState) -> ImporterResult<()> {
        if !self.state.can_transition_to(next) {
            return Err(ImportError::Other(anyhow::anyhow!(
                "illegal batch state transition: {} -> {}",
                self.state,
                next
            )));
        }
        debug!(from = %self.state, to = %next, "批次状态推进");
        self.state = next;
        Ok(())
    }
}

impl Default for BatchTracker {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// HierarchyImporterImpl - 层级导入器实现
// ==========================================
pub struct HierarchyImporterImpl<H, L, C>
where
    H: HierarchyRepository,
    L: ImportLogRepository,
    C: ImportConfigReader,
{
    // 数据访问层
    hierarchy_repo: H,
    log_repo: L,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: UniversalFileParser,
    normalizer: Box<dyn RecordNormalizer>,
    validator: Box<dyn Validator>,
}

impl<H, L, C> HierarchyImporterImpl<H, L, C>
where
    H: HierarchyRepository,
    L: ImportLogRepository,
    C: ImportConfigReader,
{
    /// 使用默认组件创建
    ///
    /// # 参数
    /// - hierarchy_repo: 层级实体仓储
    /// - log_repo: 导入日志仓储
    /// - config: 配置读取器
    pub fn new(hierarchy_repo: H, log_repo: L, config: C) -> Self {
        Self::with_components(
            hierarchy_repo,
            log_repo,
            config,
            Box::new(RecordNormalizerImpl::new()),
            Box::new(RecordValidator::new()),
        )
    }

    /// 指定规范化器与校验器创建
    pub fn with_components(
        hierarchy_repo: H,
        log_repo: L,
        config: C,
        normalizer: Box<dyn RecordNormalizer>,
        validator: Box<dyn Validator>,
    ) -> Self {
        Self {
            hierarchy_repo,
            log_repo,
            config,
            file_parser: UniversalFileParser,
            normalizer,
            validator,
        }
    }

    pub fn hierarchy_repo(&self) -> &H {
        &self.hierarchy_repo
    }

    pub fn log_repo(&self) -> &L {
        &self.log_repo
    }

    /// 单批记录上限；读取失败时使用默认值
    async fn max_records(&self) -> usize {
        match self.config.get_max_records().await {
            Ok(max) => max,
            Err(e) => {
                warn!(error = %e, "读取记录上限失败，使用默认值");
                DEFAULT_MAX_RECORDS
            }
        }
    }

    /// 文件级致命错误：仍创建并关闭审计日志，返回 total_records=0 的结果
    async fn abort_on_file_error(
        &self,
        ctx: &ImportContext,
        request: &ImportRequest,
        batch: &mut BatchTracker,
        err: ImportError,
    ) -> ImporterResult<ImportResult> {
        warn!(error = %err, "文件解析失败，终止批次");
        let logger = ImportLogger::new(&self.log_repo);

        let log_id = logger.begin(ctx, request, 0).await?;
        batch.advance(BatchState::Failed)?;

        let errors = vec![err.to_row_error(0, None, request.file_name.clone())];
        logger.finish(&log_id, 0, 0, &errors).await?;

        Ok(ImportResult {
            success: false,
            total_records: 0,
            successful_records: 0,
            failed_records: 0,
            errors,
            warnings: Vec::new(),
            import_log_id: log_id,
            state: batch.state(),
        })
    }
}

#[async_trait]
impl<H, L, C> HierarchyImporter for HierarchyImporterImpl<H, L, C>
where
    H: HierarchyRepository,
    L: ImportLogRepository,
    C: ImportConfigReader,
{
    #[instrument(
        skip(self, ctx, request),
        fields(tenant_id = %ctx.tenant_id, file_name = %request.file_name, file_type = %request.file_type)
    )]
    async fn import(
        &self,
        ctx: &ImportContext,
        request: ImportRequest,
    ) -> ImporterResult<ImportResult> {
        let start_time = Instant::now();
        let mut batch = BatchTracker::new();
        info!(bytes = request.bytes.len(), "开始导入层级数据");

        // === 阶段 1: 文件解析 ===
        batch.advance(BatchState::Parsing)?;
        let rows = match self.file_parser.parse(
            &request.bytes,
            request.file_type,
            request.period.as_ref(),
        ) {
            Ok(rows) => rows,
            Err(err) => {
                return self
                    .abort_on_file_error(ctx, &request, &mut batch, err)
                    .await
            }
        };
        let total_records = rows.len();
        info!(total_records = total_records, "文件解析完成");

        // === 阶段 2: 创建审计日志 ===
        let logger = ImportLogger::new(&self.log_repo);
        let log_id = logger.begin(ctx, &request, total_records).await?;

        // === 阶段 3: 规范化 + 校验 ===
        batch.advance(BatchState::Validating)?;
        let max_records = self.max_records().await;
        let mut arena = OutcomeArena::with_capacity(total_records);
        let mut valid: Vec<(usize, ImportRecord)> = Vec::new();

        for row in rows {
            let ordinal = arena.push(row.sheet.clone(), row.row_number);

            if ordinal >= max_records {
                let err = ImportError::RecordLimit { max: max_records };
                arena.fail(
                    ordinal,
                    vec![err.to_row_error(row.row_number, row.sheet.as_deref(), row.row_number.to_string())],
                );
                continue;
            }

            match self
                .normalizer
                .normalize(row, ctx)
                .and_then(|record| self.validator.validate(record))
            {
                Ok(record) => valid.push((ordinal, record)),
                Err(errors) => arena.fail(ordinal, errors),
            }
        }
        if total_records > max_records {
            warn!(max_records = max_records, total_records = total_records, "超出单批记录上限");
        }
        info!(
            valid = valid.len(),
            rejected = total_records - valid.len(),
            "校验完成"
        );

        // === 阶段 4: 负责人解析 + 重复标题检查 ===
        batch.advance(BatchState::Resolving)?;
        let warnings = detect_duplicate_titles(valid.iter().map(|(_, record)| record));
        for warning in &warnings {
            warn!(row = warning.row, message = %warning.message, "重复标题");
        }

        let mut resolver = HierarchyResolver::new(&self.hierarchy_repo, &ctx.tenant_id);
        let mut queue = Vec::with_capacity(valid.len());
        for (ordinal, record) in valid {
            let (owner_id, errors) = match resolver.resolve_owner(&record.owner_email).await {
                Ok(owner_id) => (Some(owner_id), Vec::new()),
                Err(err) => {
                    let row_error = err.to_row_error(
                        record.row_number,
                        record.sheet.as_deref(),
                        record.owner_email.clone(),
                    );
                    (None, vec![row_error])
                }
            };
            queue.push(QueuedRecord {
                ordinal,
                record,
                owner_id,
                errors,
            });
        }

        // === 阶段 5: 按层级解析父级并落库 ===
        batch.advance(BatchState::Executing)?;
        let executor = ImportExecutor::new(&self.hierarchy_repo);
        let level_summaries = executor
            .execute(ctx, &mut resolver, queue, &mut arena)
            .await;

        // === 阶段 6: 汇总 + 更新审计日志 ===
        let successful_records = arena.successful_count();
        let failed_records = arena.failed_count();
        let errors = arena.errors();
        let success = errors.is_empty();

        batch.advance(if success {
            BatchState::Completed
        } else {
            BatchState::Failed
        })?;
        logger
            .finish(&log_id, successful_records, failed_records, &errors)
            .await?;

        info!(
            import_log_id = %log_id,
            total_records = total_records,
            successful_records = successful_records,
            failed_records = failed_records,
            warnings = warnings.len(),
            levels = ?level_summaries,
            state = %batch.state(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "层级导入完成"
        );

        Ok(ImportResult {
            success,
            total_records,
            successful_records,
            failed_records,
            errors,
            warnings,
            import_log_id: log_id,
            state: batch.state(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_tracker_happy_path() {
        let mut batch = BatchTracker::new();
        for next in [
            BatchState::Parsing,
            BatchState::Validating,
            BatchState::Resolving,
            BatchState::Executing,
            BatchState::Completed,
        ] {
            batch.advance(next).unwrap();
        }
        assert!(batch.state().is_terminal());
    }

    #[test]
    fn test_batch_tracker_rejects_skipping_stages() {
        let mut batch = BatchTracker::new();
        batch.advance(BatchState::Parsing).unwrap();
        assert!(batch.advance(BatchState::Executing).is_err());
        assert_eq!(batch.state(), BatchState::Parsing);
    }
}
