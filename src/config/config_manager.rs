// ==========================================
// 层级导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::import_config_trait::{
    ImportConfigReader, DEFAULT_IMPORT_ROLES, DEFAULT_MAX_FILE_SIZE_BYTES, DEFAULT_MAX_RECORDS,
};
use crate::db::open_sqlite_connection;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键
// ==========================================
pub mod config_keys {
    pub const MAX_RECORDS: &str = "import.max_records";
    pub const MAX_FILE_SIZE_BYTES: &str = "import.max_file_size_bytes";
    pub const DEPARTMENT_MAPPING: &str = "import.department_mapping";
    pub const IMPORT_ROLES: &str = "import.roles";
}

/// 全局作用域
const GLOBAL_SCOPE: &str = "global";

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)
            .map_err(|e| RepositoryError::DatabaseConnectionError(e.to_string()))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![GLOBAL_SCOPE, key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES (?1, ?2, ?3)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?3, updated_at = datetime('now')",
            params![GLOBAL_SCOPE, key, value],
        )?;

        Ok(())
    }

    /// 读取正整数配置，格式错误时告警并回退默认值
    fn get_positive_usize(&self, key: &str, default: usize) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(key, &default.to_string())?;
        match value.trim().parse::<usize>() {
            Ok(v) if v > 0 => Ok(v),
            _ => {
                tracing::warn!(config_key = key, raw_value = %value, "配置值非法，使用默认值");
                Ok(default)
            }
        }
    }
}

// ==========================================
// ImportConfigReader Trait 实现
// ==========================================
#[async_trait]
impl ImportConfigReader for ConfigManager {
    async fn get_max_records(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::MAX_RECORDS, DEFAULT_MAX_RECORDS)
    }

    async fn get_max_file_size_bytes(&self) -> RepositoryResult<usize> {
        self.get_positive_usize(config_keys::MAX_FILE_SIZE_BYTES, DEFAULT_MAX_FILE_SIZE_BYTES)
    }

    async fn get_department_mapping(&self) -> RepositoryResult<HashMap<String, String>> {
        let value = self.get_config_or_default(config_keys::DEPARTMENT_MAPPING, "{}")?;
        let mapping: HashMap<String, String> = serde_json::from_str(&value).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::DEPARTMENT_MAPPING,
                raw_value = %value,
                "部门映射配置格式错误，使用空配置"
            );
            HashMap::new()
        });
        Ok(mapping)
    }

    async fn get_import_roles(&self) -> RepositoryResult<Vec<String>> {
        let value = self.get_config_or_default(config_keys::IMPORT_ROLES, DEFAULT_IMPORT_ROLES)?;

        let roles: Vec<String> = value
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if roles.is_empty() {
            Ok(DEFAULT_IMPORT_ROLES.split(',').map(str::to_string).collect())
        } else {
            Ok(roles)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let manager = setup_manager();

        assert_eq!(manager.get_max_records().await.unwrap(), DEFAULT_MAX_RECORDS);
        assert_eq!(
            manager.get_max_file_size_bytes().await.unwrap(),
            DEFAULT_MAX_FILE_SIZE_BYTES
        );
        assert!(manager.get_department_mapping().await.unwrap().is_empty());
        assert_eq!(
            manager.get_import_roles().await.unwrap(),
            vec!["admin".to_string(), "manager".to_string()]
        );
    }

    #[tokio::test]
    async fn test_overrides_are_read() {
        let manager = setup_manager();
        manager.set_config_value(config_keys::MAX_RECORDS, "5").unwrap();
        manager
            .set_config_value(config_keys::DEPARTMENT_MAPPING, r#"{"Q1 Plan": "Sales"}"#)
            .unwrap();
        manager.set_config_value(config_keys::IMPORT_ROLES, " Admin , ops ").unwrap();

        assert_eq!(manager.get_max_records().await.unwrap(), 5);
        assert_eq!(
            manager.get_department_mapping().await.unwrap().get("Q1 Plan"),
            Some(&"Sales".to_string())
        );
        assert_eq!(
            manager.get_import_roles().await.unwrap(),
            vec!["admin".to_string(), "ops".to_string()]
        );
    }

    #[tokio::test]
    async fn test_malformed_values_fall_back() {
        let manager = setup_manager();
        manager.set_config_value(config_keys::MAX_RECORDS, "-3").unwrap();
        manager.set_config_value(config_keys::DEPARTMENT_MAPPING, "not json").unwrap();

        assert_eq!(manager.get_max_records().await.unwrap(), DEFAULT_MAX_RECORDS);
        assert!(manager.get_department_mapping().await.unwrap().is_empty());
    }
}
