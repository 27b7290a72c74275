// ==========================================
// 层级导入 - 导入层
// ==========================================
// 职责: 表格文件 → 目标/举措/活动 三级实体
// 支持: Excel (.xlsx/.xls), CSV
// ==========================================

// 模块声明
pub mod error;
pub mod file_parser;
pub mod hierarchy_resolver;
pub mod import_executor;
pub mod import_logger;
pub mod importer_trait;
pub mod outcome;
pub mod pipeline;
pub mod record_normalizer;
pub mod template;
pub mod validator;

// 重导出核心类型
pub use error::{ImportError, ImporterResult};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser, XlsParser};
pub use hierarchy_resolver::{detect_duplicate_titles, HierarchyResolver, LevelLookup};
pub use import_executor::{ImportExecutor, QueuedRecord};
pub use import_logger::ImportLogger;
pub use outcome::{OutcomeArena, RecordOutcome};
pub use pipeline::{BatchTracker, HierarchyImporterImpl};
pub use record_normalizer::{canonical_field, RecordNormalizerImpl};
pub use template::{write_template, CANONICAL_COLUMNS};
pub use validator::RecordValidator;

// 重导出 Trait 接口
pub use importer_trait::{FileParser, HierarchyImporter, RecordNormalizer, Validator};
