// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、负责人档案与配置写入、CSV 构造
// ==========================================
#![allow(dead_code)]

use hierarchy_import::config::ConfigManager;
use hierarchy_import::importer::{HierarchyImporterImpl, CANONICAL_COLUMNS};
use hierarchy_import::repository::{HierarchyRepositoryImpl, ImportLogRepositoryImpl};
use rusqlite::Connection;
use rust_xlsxwriter::Workbook;
use std::error::Error;
use tempfile::NamedTempFile;

pub const TENANT: &str = "tenant-a";
pub const UPLOADER: &str = "uploader-1";

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = hierarchy_import::db::open_sqlite_connection(&db_path)?;
    hierarchy_import::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建负责人档案
pub fn insert_profiles(db_path: &str, tenant_id: &str, emails: &[&str]) -> Result<(), Box<dyn Error>> {
    let repo = HierarchyRepositoryImpl::new(db_path)?;
    for email in emails {
        repo.insert_profile(tenant_id, email, None)?;
    }
    Ok(())
}

/// 写入 global 配置
pub fn insert_config(db_path: &str, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    conn.execute(
        "INSERT OR REPLACE INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)",
        rusqlite::params![key, value],
    )?;
    Ok(())
}

/// 标准测试库: 两名负责人 ana / ben
pub fn setup_db() -> (NamedTempFile, String) {
    let (temp_file, db_path) = create_test_db().expect("Failed to create test db");
    insert_profiles(&db_path, TENANT, &["ana@example.com", "ben@example.com"])
        .expect("Failed to insert profiles");
    (temp_file, db_path)
}

/// 创建使用真实仓储的导入器
pub fn create_test_importer(
    db_path: &str,
) -> HierarchyImporterImpl<HierarchyRepositoryImpl, ImportLogRepositoryImpl, ConfigManager> {
    HierarchyImporterImpl::new(
        HierarchyRepositoryImpl::new(db_path).expect("Failed to create HierarchyRepository"),
        ImportLogRepositoryImpl::new(db_path).expect("Failed to create ImportLogRepository"),
        ConfigManager::new(db_path).expect("Failed to create ConfigManager"),
    )
}

/// 以规范列构造 CSV（每行 10 列，按 CANONICAL_COLUMNS 顺序）
pub fn canonical_csv(rows: &[[&str; 10]]) -> Vec<u8> {
    let mut text = CANONICAL_COLUMNS.join(",");
    text.push('\n');
    for row in rows {
        text.push_str(&row.join(","));
        text.push('\n');
    }
    text.into_bytes()
}

/// 构造一行规范数据
///
/// 列: type, title, owner_email, start_date, end_date, parent_title
/// 其余列: description 空，department 空，status in_progress，progress 0
pub fn row<'a>(
    entity_type: &'a str,
    title: &'a str,
    owner_email: &'a str,
    start_date: &'a str,
    end_date: &'a str,
    parent_title: &'a str,
) -> [&'a str; 10] {
    [
        entity_type,
        title,
        "",
        owner_email,
        "",
        "in_progress",
        "0",
        start_date,
        end_date,
        parent_title,
    ]
}

/// 完整三级层级（目标 → 举措 → 活动）
pub fn full_hierarchy_rows() -> Vec<[&'static str; 10]> {
    vec![
        [
            "objective",
            "Grow Revenue",
            "",
            "ana@example.com",
            "Sales",
            "in_progress",
            "50",
            "2024-01-01",
            "2024-03-31",
            "",
        ],
        row(
            "initiative",
            "Launch Campaign",
            "ana@example.com",
            "2024-01-15",
            "2024-02-28",
            "Grow Revenue",
        ),
        row(
            "activity",
            "Write Copy",
            "ben@example.com",
            "2024-01-15",
            "2024-01-20",
            "Launch Campaign",
        ),
    ]
}

/// 构造多工作表 .xlsx
///
/// 每个工作表第一行为表头；可解析为数字的单元格写为数值
pub fn build_workbook(sheets: &[(&str, Vec<Vec<&str>>)]) -> Vec<u8> {
    let mut workbook = Workbook::new();

    for (name, rows) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(*name).expect("Failed to name sheet");

        for (row_idx, row) in rows.iter().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                let (r, c) = (row_idx as u32, col_idx as u16);
                match value.parse::<f64>() {
                    Ok(number) => worksheet.write_number(r, c, number),
                    Err(_) => worksheet.write_string(r, c, *value),
                }
                .expect("Failed to write cell");
            }
        }
    }

    workbook.save_to_buffer().expect("Failed to build workbook")
}

/// 查询实体的部门
pub fn entity_department(db_path: &str, table: &str, title: &str) -> Result<String, Box<dyn Error>> {
    let conn = Connection::open(db_path)?;
    let department = conn.query_row(
        &format!("SELECT department FROM {table} WHERE title = ?1"),
        rusqlite::params![title],
        |row| row.get(0),
    )?;
    Ok(department)
}
