// ==========================================
// 层级导入 - 配置层
// ==========================================
// 职责: 导入管道配置管理（记录上限 / 文件大小上限 / 部门映射 / 导入角色）
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod import_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use import_config_trait::{
    ImportConfigReader, DEFAULT_IMPORT_ROLES, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_RECORDS,
};
