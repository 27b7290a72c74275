// ==========================================
// 层级导入 - 导入模板
// ==========================================
// 职责: 输出规范列模板（CSV），可附带每个层级一行示例
// ==========================================

use crate::importer::error::ImporterResult;
use csv::WriterBuilder;
use std::io::Write;

/// 规范列（顺序即模板列顺序）
pub const CANONICAL_COLUMNS: [&str; 10] = [
    "type",
    "title",
    "description",
    "owner_email",
    "department",
    "status",
    "progress",
    "start_date",
    "end_date",
    "parent_title",
];

/// 示例行：目标 → 举措 → 活动
const EXAMPLE_ROWS: [[&str; 10]; 3] = [
    [
        "objective",
        "Grow Revenue",
        "Increase recurring revenue",
        "owner@example.com",
        "Sales",
        "in_progress",
        "50",
        "2024-01-01",
        "2024-03-31",
        "",
    ],
    [
        "initiative",
        "Launch Campaign",
        "",
        "owner@example.com",
        "Marketing",
        "not_started",
        "0",
        "2024-01-15",
        "2024-02-28",
        "Grow Revenue",
    ],
    [
        "activity",
        "Write Copy",
        "",
        "owner@example.com",
        "Marketing",
        "not_started",
        "0",
        "2024-01-15",
        "2024-01-20",
        "Launch Campaign",
    ],
];

/// 写出模板
///
/// # 参数
/// - writer: 输出目标
/// - with_examples: 是否附带示例行
pub fn write_template<W: Write>(writer: W, with_examples: bool) -> ImporterResult<()> {
    let mut csv_writer = WriterBuilder::new().from_writer(writer);
    csv_writer.write_record(CANONICAL_COLUMNS)?;

    if with_examples {
        for row in EXAMPLE_ROWS {
            csv_writer.write_record(row)?;
        }
    }

    csv_writer.flush()?;
    Ok(())
}
