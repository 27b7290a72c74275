use super::core::ImportLogRepositoryImpl;
use crate::domain::import::{ImportLog, RowError};
use crate::domain::types::{FileType, ImportLogStatus};
use crate::repository::error::RepositoryResult;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT id, tenant_id, uploaded_by, file_name, file_type, status,
           total_records, successful_records, failed_records, errors_json,
           created_at, completed_at
    FROM import_logs
"#;

impl ImportLogRepositoryImpl {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 ID 查询单个日志
    pub fn find_by_id(&self, log_id: &str) -> RepositoryResult<Option<ImportLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} WHERE id = ?1"))?;

        match stmt.query_row(params![log_id], map_row) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询租户最近的导入日志
    pub fn list_recent(&self, tenant_id: &str, limit: usize) -> RepositoryResult<Vec<ImportLog>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE tenant_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        ))?;

        let logs = stmt
            .query_map(params![tenant_id, limit as i64], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn parse_timestamp(idx: usize, value: &str) -> SqliteResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// 映射一行 import_logs
fn map_row(row: &Row) -> SqliteResult<ImportLog> {
    let file_type_str: String = row.get(4)?;
    let status_str: String = row.get(5)?;
    let errors_json: String = row.get(9)?;
    let created_at_str: String = row.get(10)?;
    let completed_at_str: Option<String> = row.get(11)?;

    let file_type = FileType::parse(&file_type_str)
        .ok_or_else(|| conversion_error(4, format!("unknown file_type: {file_type_str}")))?;
    let status = ImportLogStatus::parse(&status_str)
        .ok_or_else(|| conversion_error(5, format!("unknown status: {status_str}")))?;
    let errors: Vec<RowError> = serde_json::from_str(&errors_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(9, Type::Text, Box::new(e)))?;

    Ok(ImportLog {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        uploaded_by: row.get(2)?,
        file_name: row.get(3)?,
        file_type,
        status,
        total_records: row.get::<_, i64>(6)? as usize,
        successful_records: row.get::<_, i64>(7)? as usize,
        failed_records: row.get::<_, i64>(8)? as usize,
        errors,
        created_at: parse_timestamp(10, &created_at_str)?,
        completed_at: completed_at_str
            .as_deref()
            .map(|s| parse_timestamp(11, s))
            .transpose()?,
    })
}
