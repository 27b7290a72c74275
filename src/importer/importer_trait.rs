// ==========================================
// 层级导入 - 导入管道 Trait
// ==========================================
// 职责: 定义导入管道及各阶段组件接口（不包含实现）
// 流程: 解析 → 规范化 → 校验 → 层级解析 → 执行 → 审计日志
// ==========================================

use crate::domain::import::{
    ImportContext, ImportRecord, ImportRequest, ImportResult, NormalizedRecord, RawRow, RowError,
};
use crate::importer::error::ImporterResult;
use async_trait::async_trait;

// ==========================================
// HierarchyImporter Trait
// ==========================================
// 用途: 层级导入主接口
// 实现者: HierarchyImporterImpl
#[async_trait]
pub trait HierarchyImporter: Send + Sync {
    /// 执行一次完整导入
    ///
    /// # 参数
    /// - ctx: 租户 / 上传人 / 部门映射
    /// - request: 文件名、文件类型、文件字节、可选期间过滤
    ///
    /// # 返回
    /// - Ok(ImportResult): 导入结果（文件级致命错误同样以 Ok 返回，total_records=0）
    /// - Err: 导入日志无法写入
    ///
    /// # 导入流程
    /// 1. 文件解析（致命错误直接终止）
    /// 2. 创建导入日志（processing）
    /// 3. 规范化 + 校验
    /// 4. 负责人解析
    /// 5. 按层级解析父级并逐条落库
    /// 6. 更新导入日志（completed / failed）
    async fn import(
        &self,
        ctx: &ImportContext,
        request: ImportRequest,
    ) -> ImporterResult<ImportResult>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口
// 实现者: CsvParser, ExcelParser, XlsParser
pub trait FileParser: Send + Sync {
    /// 解析文件字节为原始行
    ///
    /// # 返回
    /// - Ok(Vec<RawRow>): 按源顺序排列、带来源标记的数据行
    /// - Err: 文件无法读取（致命）
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImporterResult<Vec<RawRow>>;
}

// ==========================================
// RecordNormalizer Trait
// ==========================================
// 用途: 表头映射与默认值
// 实现者: RecordNormalizerImpl
pub trait RecordNormalizer: Send + Sync {
    /// 将原始行映射为规范记录
    ///
    /// # 返回
    /// - Ok(NormalizedRecord): 规范记录（字段仍为文本）
    /// - Err(Vec<RowError>): 必填字段缺失，每个缺失字段一条
    fn normalize(
        &self,
        row: RawRow,
        ctx: &ImportContext,
    ) -> Result<NormalizedRecord, Vec<RowError>>;
}

// ==========================================
// Validator Trait
// ==========================================
// 用途: 字段级与跨字段校验
// 实现者: RecordValidator
pub trait Validator: Send + Sync {
    /// 校验规范记录
    ///
    /// # 返回
    /// - Ok(ImportRecord): 通过校验的强类型记录
    /// - Err(Vec<RowError>): 全部违规项，每项一条
    fn validate(&self, record: NormalizedRecord) -> Result<ImportRecord, Vec<RowError>>;
}
