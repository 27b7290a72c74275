// ==========================================
// 层级导入 - 核心库
// ==========================================
// 职责: 目标 / 举措 / 活动 三级层级的批量导入与对账
// 技术栈: Rust + SQLite
// 流程: 文件解析 → 规范化 → 校验 → 层级解析 → 逐条落库 → 审计日志
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 导入管道
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 上传边界
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BatchState, EntityStatus, EntityType, FileType, ImportLogStatus};

// 领域实体
pub use domain::import::{
    DatePeriod, ImportContext, ImportLog, ImportRecord, ImportRequest, ImportResult,
    ImportWarning, RowError,
};

// 导入管道
pub use importer::{HierarchyImporter, HierarchyImporterImpl, ImportError};

// API
pub use api::{ImportApi, Uploader};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "层级导入";
