// ==========================================
// 层级导入 - API 层
// ==========================================
// 职责: 上传边界（权限 / 大小 / 类型）与导入日志查询，供命令行调用
// ==========================================

pub mod error;
pub mod import_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use import_api::{ImportApi, Uploader};
