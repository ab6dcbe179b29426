//! 点表校验引擎
//!
//! 对分配完成后导出的点表（主"IO点表"Sheet与若干第三方
//! 设备Sheet）执行规则校验。引擎收集全部错误后一次返回，
//! 规则只做观察，不做任何修复。

use std::collections::BTreeMap;
use std::path::Path;

use calamine::{open_workbook, Reader, Xlsx};

use super::constants as c;
use super::rules::{self, RowContext};
use crate::utils::error::{AppError, AppResult};

/// 一个已读入内存的Sheet
#[derive(Debug, Clone, Default)]
pub struct SheetData {
    /// Sheet名称
    pub name: String,
    /// 表头行
    pub header: Vec<String>,
    /// 数据行
    pub rows: Vec<Vec<String>>,
}

impl SheetData {
    pub fn new(name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn missing_columns(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|col| !self.header.iter().any(|h| h.trim() == **col))
            .map(|col| col.to_string())
            .collect()
    }
}

/// 一个已读入内存的工作簿
#[derive(Debug, Clone, Default)]
pub struct WorkbookData {
    pub sheets: Vec<SheetData>,
}

/// 从Excel文件装载工作簿，首行作为表头
pub fn load_workbook(path: impl AsRef<Path>) -> AppResult<WorkbookData> {
    let path = path.as_ref();
    log::info!("装载点表文件: {}", path.display());

    let mut workbook: Xlsx<_> = open_workbook(path)
        .map_err(|e| AppError::validation_error(format!("无法打开Excel文件: {}", e)))?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names().to_owned() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Some(Ok(range)) => range,
            Some(Err(e)) => {
                return Err(AppError::validation_error(format!(
                    "无法读取工作表 {}: {}",
                    sheet_name, e
                )))
            }
            None => continue,
        };

        let mut rows_iter = range.rows().map(|row| {
            row.iter()
                .map(|cell| cell.to_string().trim().to_string())
                .collect::<Vec<String>>()
        });
        let header = rows_iter.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = rows_iter.collect();
        sheets.push(SheetData::new(sheet_name, header, rows));
    }

    Ok(WorkbookData { sheets })
}

/// 点表校验器
pub struct IoTableValidator;

impl IoTableValidator {
    /// 校验整个工作簿，返回全部错误消息
    pub fn validate_workbook(workbook: &WorkbookData) -> Vec<String> {
        let mut errors = Vec::new();

        if workbook.sheets.is_empty() {
            errors.push("validation failed: Excel文件中不包含任何工作表".to_string());
            return errors;
        }

        let mut main_sheet_found = false;
        for sheet in &workbook.sheets {
            if sheet.is_empty() {
                continue;
            }
            if sheet.name == c::PLC_IO_SHEET_NAME {
                main_sheet_found = true;
                errors.extend(Self::validate_main_sheet(sheet));
            } else {
                errors.extend(Self::validate_third_party_sheet(sheet));
            }
        }

        if !main_sheet_found {
            errors.push(format!(
                "validation failed: 未找到必需的主工作表\"{}\"，仅校验了其余工作表",
                c::PLC_IO_SHEET_NAME
            ));
        }

        log::info!("点表校验完成，共 {} 条错误", errors.len());
        errors
    }

    /// 从文件装载并校验
    pub fn validate_file(path: impl AsRef<Path>) -> AppResult<Vec<String>> {
        let workbook = load_workbook(path)?;
        Ok(Self::validate_workbook(&workbook))
    }

    /// 校验主IO点表Sheet
    fn validate_main_sheet(sheet: &SheetData) -> Vec<String> {
        let mut errors = Vec::new();

        let missing = sheet.missing_columns(c::MAIN_REQUIRED_COLS);
        if !missing.is_empty() {
            for column in missing {
                errors.push(format!(
                    "validation failed (sheet:\"{}\"): 缺少必需的列\"{}\"",
                    sheet.name, column
                ));
            }
            // 缺少必需列时不再做行级校验
            return errors;
        }

        let rules = rules::main_io_rules();
        for (index, cells) in sheet.rows.iter().enumerate() {
            // Excel行号从1起，表头占第1行
            let excel_row = index + 2;
            let ctx = RowContext::new(&sheet.name, excel_row, &sheet.header, cells);
            for rule in &rules {
                errors.extend(rule.validate(&ctx));
            }
        }

        errors.extend(Self::check_hmi_name_uniqueness(sheet));
        errors
    }

    /// 校验第三方设备Sheet
    fn validate_third_party_sheet(sheet: &SheetData) -> Vec<String> {
        let mut errors = Vec::new();

        // 缺列只影响设定值校验，其余规则继续执行
        for column in sheet.missing_columns(c::TP_REQUIRED_COLS_FOR_SETPOINT_CHECK) {
            errors.push(format!(
                "validation failed (sheet:\"{}\"): 缺少校验设定值所必需的列\"{}\"",
                sheet.name, column
            ));
        }

        let rules = rules::third_party_rules();
        for (index, cells) in sheet.rows.iter().enumerate() {
            let excel_row = index + 2;
            let ctx = RowContext::new(&sheet.name, excel_row, &sheet.header, cells);
            for rule in &rules {
                errors.extend(rule.validate(&ctx));
            }
        }

        errors
    }

    /// 全表范围内HMI变量名不允许重复
    fn check_hmi_name_uniqueness(sheet: &SheetData) -> Vec<String> {
        let column_index = match sheet.header.iter().position(|h| h.trim() == c::HMI_NAME_COL) {
            Some(index) => index,
            None => return Vec::new(),
        };

        let mut occurrences: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (index, cells) in sheet.rows.iter().enumerate() {
            let name = cells.get(column_index).map(|s| s.trim()).unwrap_or("");
            if name.is_empty() {
                continue;
            }
            occurrences.entry(name.to_string()).or_default().push(index + 2);
        }

        occurrences
            .into_iter()
            .filter(|(_, rows)| rows.len() > 1)
            .map(|(name, rows)| {
                let row_list = rows
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                rules::format_error(
                    &sheet.name,
                    rows[0],
                    &format!("\"{}\"的值\"{}\"重复出现，所在行: {}", c::HMI_NAME_COL, name, row_list),
                    None,
                    Some(c::HMI_NAME_COL),
                    Some(&name),
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn main_header() -> Vec<String> {
        strings(&[
            c::HMI_NAME_COL,
            c::DESCRIPTION_COL,
            c::POWER_SUPPLY_TYPE_COL,
            c::WIRING_SYSTEM_COL,
            c::MODULE_TYPE_COL,
            c::RANGE_LOW_LIMIT_COL,
            c::RANGE_HIGH_LIMIT_COL,
            c::SLL_SET_COL,
            c::SL_SET_COL,
            c::SH_SET_COL,
            c::SHH_SET_COL,
        ])
    }

    /// 合法的非预留AI行
    fn good_ai_row(hmi: &str) -> Vec<String> {
        strings(&[hmi, "温度", "有源", "四线制", "AI", "0", "100", "", "20", "", ""])
    }

    #[test]
    fn test_valid_sheet_produces_no_errors() {
        let sheet = SheetData::new(
            c::PLC_IO_SHEET_NAME,
            main_header(),
            vec![good_ai_row("TT001"), good_ai_row("TT002")],
        );
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });
        assert!(errors.is_empty(), "不应有错误: {:?}", errors);
    }

    #[test]
    fn test_consistency_error_reported() {
        let mut row = good_ai_row("TT001");
        row[1] = String::new(); // 描述为空
        let sheet = SheetData::new(c::PLC_IO_SHEET_NAME, main_header(), vec![row]);
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });

        assert!(errors.iter().any(|e| e.contains("excel_row:2")
            && e.contains(c::HMI_NAME_COL)
            && e.contains(c::DESCRIPTION_COL)));
    }

    #[test]
    fn test_hmi_name_uniqueness_names_both_rows() {
        let sheet = SheetData::new(
            c::PLC_IO_SHEET_NAME,
            main_header(),
            vec![good_ai_row("TT001"), good_ai_row("TT002"), good_ai_row("TT001")],
        );
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });

        let duplicate_error = errors
            .iter()
            .find(|e| e.contains("重复出现"))
            .expect("应报重复错误");
        assert!(duplicate_error.contains("TT001"));
        assert!(duplicate_error.contains("2"), "应给出第一处行号");
        assert!(duplicate_error.contains("4"), "应给出第二处行号");
    }

    #[test]
    fn test_missing_columns_stop_row_checks() {
        let sheet = SheetData::new(
            c::PLC_IO_SHEET_NAME,
            strings(&[c::HMI_NAME_COL, c::DESCRIPTION_COL]),
            vec![strings(&["TT001", ""])],
        );
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });

        assert!(errors.iter().all(|e| e.contains("缺少必需的列")));
        assert!(errors.iter().any(|e| e.contains(c::MODULE_TYPE_COL)));
    }

    #[test]
    fn test_third_party_real_setpoint_error() {
        let header = strings(&[
            c::TP_INPUT_VAR_NAME_COL,
            c::TP_INPUT_DATA_TYPE_COL,
            c::TP_INPUT_SLL_SET_COL,
            c::TP_INPUT_SL_SET_COL,
            c::TP_INPUT_SH_SET_COL,
            c::TP_INPUT_SHH_SET_COL,
        ]);
        let sheet = SheetData::new(
            "第三方设备",
            header,
            vec![strings(&["FLOW_01", "REAL", "", "20", "80", ""])],
        );
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });

        // 主表缺失的警告 + 设定值冲突
        assert!(errors.iter().any(|e| e.contains("多个有效值")));
        assert!(errors.iter().any(|e| e.contains("未找到必需的主工作表")));
    }

    #[test]
    fn test_engine_collects_all_errors() {
        let mut bad_row = good_ai_row("TT001");
        bad_row[2] = "错误取值".to_string(); // 供电类型无效
        bad_row[5] = "abc".to_string(); // 量程低限非数字
        let sheet = SheetData::new(c::PLC_IO_SHEET_NAME, main_header(), vec![bad_row]);
        let errors = IoTableValidator::validate_workbook(&WorkbookData {
            sheets: vec![sheet],
        });

        assert!(errors.len() >= 2, "全部错误一次返回: {:?}", errors);
    }
}
