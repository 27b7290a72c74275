// ==========================================
// 层级导入 - 文件解析器实现
// ==========================================
// 支持: Excel (.xlsx/.xls) / 分隔文本 (.csv)
// 输入: 文件字节（上传边界已完成大小与类型检查）
// 行号: 展示行号 = 数据行序号 + 2（表头为第 1 行）
// ==========================================

use crate::domain::import::{DatePeriod, RawRow};
use crate::domain::types::FileType;
use crate::importer::error::{ImportError, ImporterResult};
use crate::importer::importer_trait::FileParser;
use crate::importer::record_normalizer::canonical_field;
use crate::importer::validator::parse_date;
use calamine::{Data, DataType, Range, Reader, Xls, Xlsx};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::io::Cursor;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// 候选分隔符
const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 根据表头行推断分隔符（默认逗号）
    fn sniff_delimiter(text: &str) -> u8 {
        let header_line = text.lines().next().unwrap_or("");
        DELIMITERS
            .iter()
            .copied()
            .map(|d| (d, header_line.bytes().filter(|b| *b == d).count()))
            .filter(|(_, count)| *count > 0)
            .max_by_key(|(_, count)| *count)
            .map(|(d, _)| d)
            .unwrap_or(b',')
    }
}

impl FileParser for CsvParser {
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImporterResult<Vec<RawRow>> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|e| {
            ImportError::CsvParseError(format!("file is not valid UTF-8 text ({})", e))
        })?;

        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::sniff_delimiter(text))
            .from_reader(text.as_bytes());

        // 读取表头
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();

        // 读取所有行
        let mut rows = Vec::new();
        for (data_idx, result) in reader.records().enumerate() {
            let record = result?;
            let mut cells = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    if !header.is_empty() {
                        cells.insert(header.clone(), value.trim().to_string());
                    }
                }
            }

            // 跳过完全空白的行
            if cells.values().all(|v| v.is_empty()) {
                continue;
            }

            // 按记录计数，与换行符风格及单元格内换行无关
            rows.push(RawRow {
                sheet: None,
                row_number: data_idx + 2,
                cells,
            });
        }

        Ok(rows)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImporterResult<Vec<RawRow>> {
        parse_workbook::<Xlsx<_>>(bytes)
    }
}

/// Excel 97-2003 (.xls)
pub struct XlsParser;

impl FileParser for XlsParser {
    fn parse_to_raw_rows(&self, bytes: &[u8]) -> ImporterResult<Vec<RawRow>> {
        parse_workbook::<Xls<_>>(bytes)
    }
}

/// 遍历工作簿全部工作表
fn parse_workbook<'a, R>(bytes: &'a [u8]) -> ImporterResult<Vec<RawRow>>
where
    R: Reader<Cursor<&'a [u8]>>,
    R::Error: std::fmt::Display,
{
    let mut workbook =
        R::new(Cursor::new(bytes)).map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    if sheet_names.is_empty() {
        return Err(ImportError::ExcelParseError(
            "workbook contains no sheets".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for sheet_name in sheet_names {
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(format!("{}: {}", sheet_name, e)))?;

        let sheet_rows = rows_from_range(&sheet_name, &range);
        tracing::debug!(sheet = %sheet_name, rows = sheet_rows.len(), "工作表解析完成");
        rows.extend(sheet_rows);
    }

    Ok(rows)
}

/// 将单个工作表区域转换为原始行
///
/// 少于 2 行（表头 + 至少 1 行数据）的工作表跳过
pub fn rows_from_range(sheet_name: &str, range: &Range<Data>) -> Vec<RawRow> {
    if range.height() < 2 {
        return Vec::new();
    }

    // 区域可能不从 A1 开始
    let first_row = range.start().map(|(r, _)| r as usize).unwrap_or(0);

    let mut iter = range.rows();
    let Some(header_row) = iter.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = header_row.iter().map(cell_to_string).collect();

    let mut rows = Vec::new();
    for (data_idx, data_row) in iter.enumerate() {
        let mut cells = HashMap::new();

        for (col_idx, cell) in data_row.iter().enumerate() {
            if let Some(header) = headers.get(col_idx) {
                if !header.is_empty() {
                    cells.insert(header.clone(), cell_to_string(cell));
                }
            }
        }

        // 跳过完全空白的行
        if cells.values().all(|v| v.is_empty()) {
            continue;
        }

        rows.push(RawRow {
            sheet: Some(sheet_name.to_string()),
            row_number: first_row + data_idx + 2,
            cells,
        });
    }

    rows
}

/// 单元格 → 文本
///
/// 日期单元格输出 YYYY-MM-DD；整数值浮点不带小数部分
fn cell_to_string(cell: &Data) -> String {
    let text = match cell {
        Data::Empty => String::new(),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| cell.to_string()),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    };
    text.trim().to_string()
}

// ==========================================
// 通用文件解析器（根据声明类型选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析并按期间过滤
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - file_type: 声明的文件类型
    /// - period: 可选期间 [start, end]
    pub fn parse(
        &self,
        bytes: &[u8],
        file_type: FileType,
        period: Option<&DatePeriod>,
    ) -> ImporterResult<Vec<RawRow>> {
        let rows = match file_type {
            FileType::Csv => CsvParser.parse_to_raw_rows(bytes)?,
            FileType::Xlsx => ExcelParser.parse_to_raw_rows(bytes)?,
            FileType::Xls => XlsParser.parse_to_raw_rows(bytes)?,
        };

        Ok(match period {
            Some(period) => Self::filter_by_period(rows, period),
            None => rows,
        })
    }

    /// 期间过滤
    ///
    /// 仅剔除日期可解析且未完全落在期间内的行；日期无法解析的行保留给校验阶段报告
    pub fn filter_by_period(rows: Vec<RawRow>, period: &DatePeriod) -> Vec<RawRow> {
        let before = rows.len();
        let kept: Vec<RawRow> = rows
            .into_iter()
            .filter(|row| {
                let start = find_cell(row, "start_date").and_then(parse_date);
                let end = find_cell(row, "end_date").and_then(parse_date);
                match (start, end) {
                    (Some(start), Some(end)) => period.contains_range(start, end),
                    _ => true,
                }
            })
            .collect();

        tracing::debug!(
            before = before,
            after = kept.len(),
            period_start = %period.start,
            period_end = %period.end,
            "期间过滤完成"
        );
        kept
    }
}

/// 按规范字段名查找原始单元格
///
/// 多个表头映射到同一字段时取表头排序后第一个非空值，与规范化阶段一致
fn find_cell<'a>(row: &'a RawRow, field: &str) -> Option<&'a str> {
    row.cells
        .iter()
        .filter(|(header, value)| canonical_field(header) == field && !value.is_empty())
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, value)| value.as_str())
}
