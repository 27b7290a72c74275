// ==========================================
// 层级导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入管道所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// 单批最大记录数（默认）
pub const DEFAULT_MAX_RECORDS: usize = 1000;

/// 上传文件大小上限（默认 10 MiB）
pub const DEFAULT_MAX_FILE_SIZE_BYTES: usize = 10 * 1024 * 1024;

/// 具备导入权限的角色（默认）
pub const DEFAULT_IMPORT_ROLES: &str = "admin,manager";

// ==========================================
// ImportConfigReader Trait
// ==========================================
// 用途: 导入管道与上传边界所需的配置读取接口
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait ImportConfigReader: Send + Sync {
    /// 获取单批最大记录数
    ///
    /// # 默认值
    /// - 1000
    async fn get_max_records(&self) -> RepositoryResult<usize>;

    /// 获取上传文件大小上限（字节）
    ///
    /// # 默认值
    /// - 10 MiB
    async fn get_max_file_size_bytes(&self) -> RepositoryResult<usize>;

    /// 获取工作表名 → 部门映射
    ///
    /// # 返回
    /// - HashMap<String, String>: 配置格式为 JSON 对象 {"Sheet1": "Sales"}
    ///
    /// # 默认值
    /// - 空映射（部门回退为工作表名）
    async fn get_department_mapping(&self) -> RepositoryResult<HashMap<String, String>>;

    /// 获取具备导入权限的角色列表（小写）
    ///
    /// # 默认值
    /// - ["admin", "manager"]
    async fn get_import_roles(&self) -> RepositoryResult<Vec<String>>;
}
