//! 点表验证：规则引擎与工作簿装载

/// 校验相关常量
pub mod constants;
/// 校验规则
pub mod rules;
/// 校验引擎
pub mod validator;

pub use rules::{RowContext, ValidationRule};
pub use validator::{load_workbook, IoTableValidator, SheetData, WorkbookData};
