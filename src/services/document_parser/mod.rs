//! 文档点位提取
//!
//! 从文档的表格区域提取原始数据行并经分类器转换为点位。
//! 文档抽象为若干个表格区域（单元格文本网格），Excel文件
//! 通过 calamine 装载，每个非空工作表算一个表格区域。

/// 智能表头检测器
pub mod header_detector;
/// 点位分类器
pub mod classifier;

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};

use crate::models::ExtractionReport;
use crate::utils::error::{AppError, AppResult};

pub use classifier::{Classifier, RowClassification};
pub use header_detector::{HeaderDetector, SemanticField, HEADER_ROW_KEYWORDS};

/// 一个表格区域：单元格文本网格
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableRegion {
    /// 行 × 列的单元格文本，已去除首尾空白
    pub rows: Vec<Vec<String>>,
}

impl TableRegion {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }
}

/// 一份待提取的文档
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// 文档中的表格区域
    pub tables: Vec<TableRegion>,
}

impl Document {
    pub fn new(tables: Vec<TableRegion>) -> Self {
        Self { tables }
    }

    /// 从Excel文件装载文档，每个非空工作表算一个表格区域
    pub fn from_xlsx_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        log::info!("装载Excel文档: {}", path.display());

        let mut workbook: Xlsx<_> = open_workbook(path)
            .map_err(|e| AppError::document_unreadable(format!("无法打开Excel文件: {}", e)))?;

        let mut tables = Vec::new();
        for sheet_name in workbook.sheet_names().to_owned() {
            let range = match workbook.worksheet_range(&sheet_name) {
                Some(Ok(range)) => range,
                Some(Err(e)) => {
                    return Err(AppError::document_unreadable(format!(
                        "无法读取工作表 {}: {}",
                        sheet_name, e
                    )))
                }
                None => continue,
            };

            let rows: Vec<Vec<String>> = range
                .rows()
                .map(|row| row.iter().map(|cell| cell.to_string().trim().to_string()).collect())
                .collect();
            if rows.iter().any(|row| row.iter().any(|cell| !cell.is_empty())) {
                tables.push(TableRegion::new(rows));
            }
        }

        log::info!("文档装载完成，共 {} 个表格区域", tables.len());
        Ok(Self { tables })
    }
}

/// 带表头定位结果的表格
#[derive(Debug, Clone)]
pub struct ExtractedTable {
    /// 表头行单元格
    pub header: Vec<String>,
    /// 表头行在区域内的行索引（0起）
    pub header_row: usize,
    /// 数据行：（区域内1起行号, 单元格）
    pub rows: Vec<(usize, Vec<String>)>,
}

/// 一个原始数据行：语义字段 → 单元格文本
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 区域内行号（1起）
    pub row_number: usize,
    values: BTreeMap<SemanticField, String>,
}

impl RawRow {
    pub fn new(row_number: usize) -> Self {
        Self {
            row_number,
            values: BTreeMap::new(),
        }
    }

    /// 按表头映射从单元格构造
    pub fn from_cells(
        row_number: usize,
        mapping: &BTreeMap<SemanticField, usize>,
        cells: &[String],
    ) -> Self {
        let mut row = Self::new(row_number);
        for (field, col) in mapping {
            let value = cells.get(*col).map(|c| c.trim().to_string()).unwrap_or_default();
            row.set(*field, value);
        }
        row
    }

    pub fn set(&mut self, field: SemanticField, value: String) {
        self.values.insert(field, value);
    }

    /// 字段文本，未映射的字段视为空
    pub fn get(&self, field: SemanticField) -> &str {
        self.values.get(&field).map(|s| s.as_str()).unwrap_or("")
    }
}

/// 点位提取器
pub struct PointExtractor;

impl PointExtractor {
    /// 在文档的所有表格区域中定位表头并切出数据行
    ///
    /// 没有任何区域能定位到表头时返回 `NoTables`。
    pub fn extract_tables(document: &Document) -> AppResult<Vec<ExtractedTable>> {
        let mut tables = Vec::new();

        for (table_index, region) in document.tables.iter().enumerate() {
            if region.rows.len() < 2 {
                log::debug!("表格 {} 行数不足，跳过", table_index + 1);
                continue;
            }
            let header_row = match Self::find_header_row(region) {
                Some(index) => index,
                None => {
                    log::debug!("表格 {} 未识别到表头行，跳过", table_index + 1);
                    continue;
                }
            };

            let header = region.rows[header_row].clone();
            let rows = region
                .rows
                .iter()
                .enumerate()
                .skip(header_row + 1)
                .map(|(i, cells)| (i + 1, cells.clone()))
                .collect();
            tables.push(ExtractedTable {
                header,
                header_row,
                rows,
            });
        }

        if tables.is_empty() {
            return Err(AppError::NoTables);
        }
        Ok(tables)
    }

    /// 在区域前10行内定位表头行：至少命中2个已知表头关键字
    fn find_header_row(region: &TableRegion) -> Option<usize> {
        let scan_limit = region.rows.len().min(10);

        for (index, row) in region.rows.iter().take(scan_limit).enumerate() {
            let row_text = row.join(" ");
            let matched = HEADER_ROW_KEYWORDS
                .iter()
                .filter(|kw| row_text.contains(**kw))
                .count();
            if matched >= 2 {
                log::debug!("识别到表头行: 第 {} 行，命中 {} 个关键字", index, matched);
                return Some(index);
            }
        }

        // 没有明确表头时退而找包含"位号"的行
        region
            .rows
            .iter()
            .take(scan_limit)
            .position(|row| row.join(" ").contains("位号"))
    }

    /// 提取并分类文档中的全部点位
    pub fn extract_points(document: &Document) -> AppResult<ExtractionReport> {
        let tables = Self::extract_tables(document)?;
        let mut report = ExtractionReport::default();

        for (table_index, table) in tables.iter().enumerate() {
            let mapping = HeaderDetector::detect(&table.header);
            if mapping.is_empty() {
                log::warn!("表格 {} 未识别到任何字段，跳过", table_index + 1);
                continue;
            }

            for (row_number, cells) in &table.rows {
                // 整行为空不计入统计
                if cells.iter().all(|c| c.is_empty()) {
                    continue;
                }
                report.total_rows += 1;

                let raw = RawRow::from_cells(*row_number, &mapping, cells);
                match Classifier::classify_row(&raw) {
                    Ok(RowClassification::Point(point)) => report.points.push(point),
                    Ok(RowClassification::Communication) => report.excluded_rows += 1,
                    Ok(RowClassification::Heading) => report.skipped_rows += 1,
                    Err(e) => {
                        log::warn!("第 {} 行解析失败，已跳过: {}", row_number, e);
                        report.skipped_rows += 1;
                    }
                }
            }
        }

        log::info!(
            "点位提取完成: 共 {} 行，有效 {} 个，通讯 {} 个，跳过 {} 个",
            report.total_rows,
            report.points.len(),
            report.excluded_rows,
            report.skipped_rows
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SignalKind;

    fn grid(rows: &[&[&str]]) -> TableRegion {
        TableRegion::new(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_find_header_row_skips_title_rows() {
        let region = grid(&[
            &["某装置IO点表", "", "", ""],
            &["", "", "", ""],
            &["仪表位号", "检测点名称", "信号类型", "单位"],
            &["PT0101", "进口压力", "AI", "MPa"],
        ]);
        let tables = PointExtractor::extract_tables(&Document::new(vec![region])).unwrap();
        assert_eq!(tables[0].header_row, 2);
        assert_eq!(tables[0].rows.len(), 1);
        assert_eq!(tables[0].rows[0].0, 4, "数据行号为区域内1起行号");
    }

    #[test]
    fn test_no_tables_error() {
        let document = Document::new(vec![]);
        let err = PointExtractor::extract_points(&document).unwrap_err();
        assert_eq!(err.error_code(), "NO_TABLES");

        // 有区域但找不到表头同样算没有表格
        let document = Document::new(vec![grid(&[&["a", "b"], &["c", "d"]])]);
        let err = PointExtractor::extract_points(&document).unwrap_err();
        assert_eq!(err.error_code(), "NO_TABLES");
    }

    #[test]
    fn test_extract_points_pipeline() {
        let region = grid(&[
            &["仪表位号", "检测点名称", "信号范围", "信号类型", "单位"],
            &["BPCS", "", "", "", ""],
            &["PT0101", "进口压力", "4~20mA", "AI", "MPa"],
            &["RS-01", "总线网关", "", "RS485", ""],
            &["XS0102", "泵运行状态", "", "", ""],
            &["", "", "", "", ""],
        ]);
        let report = PointExtractor::extract_points(&Document::new(vec![region])).unwrap();

        assert_eq!(report.total_rows, 4);
        assert_eq!(report.points.len(), 2);
        assert_eq!(report.excluded_rows, 1);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(report.points[0].instrument_tag, "PT0101");
        assert_eq!(report.points[0].signal_type, SignalKind::AI);
        assert_eq!(report.points[1].signal_type, SignalKind::DI);
    }

    #[test]
    fn test_ambiguous_rows_are_skipped_not_fatal() {
        let region = grid(&[
            &["仪表位号", "检测点名称", "信号类型"],
            &["", "", "AI"],
            &["PT0101", "进口压力", "AI"],
        ]);
        let report = PointExtractor::extract_points(&Document::new(vec![region])).unwrap();
        assert_eq!(report.points.len(), 1);
        assert_eq!(report.skipped_rows, 1);
    }

    #[test]
    fn test_unreadable_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not an xlsx file").unwrap();

        let err = Document::from_xlsx_path(&path).unwrap_err();
        assert_eq!(err.error_code(), "DOCUMENT_UNREADABLE");
    }
}
