//! 校验规则
//!
//! 每条规则实现 `validate(ctx) -> Vec<String>`，返回空表表示
//! 通过。规则之间互不依赖，引擎逐条执行并拼接全部错误，
//! 不在规则边界抛出异常，也不会在首个错误处停下。

use super::constants as c;

/// 判断单元格取值是否视为"已填写"（去空白后非空）
pub fn is_value_present(value: &str) -> bool {
    !value.trim().is_empty()
}

/// 判断取值（若填写）是否为合法数字，布尔字面量显式拒绝
pub fn is_numeric(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        // 空值走"必填"类规则，不算数字错误
        return true;
    }
    if trimmed.eq_ignore_ascii_case("true") || trimmed.eq_ignore_ascii_case("false") {
        return false;
    }
    trimmed.parse::<f64>().is_ok()
}

/// 统一格式化错误消息
///
/// 形如 `validation failed (sheet:"IO点表", excel_row:5, column:"线制",
/// value:"..."): 消息`，取值超过50个字符时截断并加省略号。
pub fn format_error(
    sheet_name: &str,
    excel_row: usize,
    message: &str,
    point_name: Option<&str>,
    column_name: Option<&str>,
    value: Option<&str>,
) -> String {
    let mut location = format!("sheet:\"{}\", excel_row:{}", sheet_name, excel_row);
    if let Some(point) = point_name {
        location.push_str(&format!(", point:\"{}\"", point));
    }
    if let Some(column) = column_name {
        location.push_str(&format!(", column:\"{}\"", column));
    }
    if let Some(value) = value.filter(|v| is_value_present(v)) {
        let display: String = if value.chars().count() > 50 {
            let truncated: String = value.chars().take(50).collect();
            format!("{}...", truncated)
        } else {
            value.to_string()
        };
        location.push_str(&format!(", value:\"{}\"", display));
    }
    format!("validation failed ({}): {}", location, message)
}

/// 单行校验上下文
///
/// 预先计算常用取值，避免各规则重复查列。
pub struct RowContext<'a> {
    pub sheet_name: &'a str,
    pub excel_row: usize,
    header: &'a [String],
    cells: &'a [String],
    /// HMI变量名是否已填写
    pub hmi_name_present: bool,
    /// 变量描述是否已填写
    pub description_present: bool,
    /// 模块类型（已转大写并去空白）
    pub module_type: String,
    /// 数据类型（已转大写并去空白）
    pub data_type: String,
}

impl<'a> RowContext<'a> {
    pub fn new(
        sheet_name: &'a str,
        excel_row: usize,
        header: &'a [String],
        cells: &'a [String],
    ) -> Self {
        let mut ctx = Self {
            sheet_name,
            excel_row,
            header,
            cells,
            hmi_name_present: false,
            description_present: false,
            module_type: String::new(),
            data_type: String::new(),
        };
        ctx.hmi_name_present = is_value_present(ctx.get(c::HMI_NAME_COL));
        ctx.description_present = is_value_present(ctx.get(c::DESCRIPTION_COL));
        ctx.module_type = ctx.get(c::MODULE_TYPE_COL).trim().to_uppercase();
        ctx.data_type = ctx.get(c::TP_INPUT_DATA_TYPE_COL).trim().to_uppercase();
        ctx
    }

    /// 按列名取单元格文本，缺列视为空
    pub fn get(&self, column: &str) -> &str {
        self.header
            .iter()
            .position(|h| h.trim() == column)
            .and_then(|i| self.cells.get(i))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    /// 是否为预留点位（HMI变量名为空）
    pub fn is_reserved(&self) -> bool {
        !self.hmi_name_present
    }

    /// 第三方表中用于定位点位的变量名
    fn point_name(&self) -> String {
        let name = self.get(c::TP_INPUT_VAR_NAME_COL);
        if is_value_present(name) {
            name.trim().to_string()
        } else {
            format!("行 {} 未命名点位", self.excel_row)
        }
    }
}

/// 校验规则接口
pub trait ValidationRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String>;
}

// --- 主IO表规则 ---

/// HMI变量名与变量描述必须同时填写或同时为空
pub struct HmiDescriptionConsistencyRule;

impl ValidationRule for HmiDescriptionConsistencyRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.hmi_name_present != ctx.description_present {
            let hmi_status = if ctx.hmi_name_present { "已填写" } else { "为空" };
            let desc_status = if ctx.description_present { "已填写" } else { "为空" };
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!(
                    "\"{}\"({}) 与 \"{}\"({}) 状态不一致，两者必须同时填写或同时为空",
                    c::HMI_NAME_COL,
                    hmi_status,
                    c::DESCRIPTION_COL,
                    desc_status
                ),
                None,
                None,
                None,
            )]
        } else {
            Vec::new()
        }
    }
}

/// 预留点位的指定列必须为空
pub struct ReservedPointEmptyRule {
    pub column: &'static str,
}

impl ValidationRule for ReservedPointEmptyRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if !ctx.is_reserved() {
            return Vec::new();
        }
        let value = ctx.get(self.column);
        if is_value_present(value) {
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!("该行为预留点位，但\"{}\"不为空，预留点位的此列必须为空", self.column),
                None,
                Some(self.column),
                Some(value),
            )]
        } else {
            Vec::new()
        }
    }
}

/// 非预留点位的指定列必须填写
pub struct NonReservedRequiredRule {
    pub column: &'static str,
}

impl ValidationRule for NonReservedRequiredRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.is_reserved() {
            return Vec::new();
        }
        if !is_value_present(ctx.get(self.column)) {
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!("该行为非预留点位，但\"{}\"为空，此列必填", self.column),
                None,
                Some(self.column),
                None,
            )]
        } else {
            Vec::new()
        }
    }
}

/// 非预留点位的供电类型取值校验
pub struct PowerSupplyValueRule;

impl ValidationRule for PowerSupplyValueRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.is_reserved() {
            return Vec::new();
        }
        let value = ctx.get(c::POWER_SUPPLY_TYPE_COL);
        if !is_value_present(value) {
            return Vec::new();
        }
        let actual = value.trim();
        if !c::ALLOWED_POWER_SUPPLY_VALUES.contains(&actual) {
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!(
                    "\"{}\"的值无效，只允许填写: {}",
                    c::POWER_SUPPLY_TYPE_COL,
                    c::ALLOWED_POWER_SUPPLY_VALUES.join(", ")
                ),
                None,
                Some(c::POWER_SUPPLY_TYPE_COL),
                Some(actual),
            )]
        } else {
            Vec::new()
        }
    }
}

/// 非预留点位的线制取值校验，按模块类型区分允许值
pub struct WiringSystemValueRule;

impl ValidationRule for WiringSystemValueRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.is_reserved() {
            return Vec::new();
        }
        let value = ctx.get(c::WIRING_SYSTEM_COL);
        if !is_value_present(value) {
            return Vec::new();
        }
        let actual = value.trim();
        let module_type = ctx.module_type.as_str();

        if module_type == c::MODULE_TYPE_AI || module_type == c::MODULE_TYPE_AO {
            if !c::ALLOWED_WIRING_SYSTEM_VALUES_AI_AO.contains(&actual) {
                return vec![format_error(
                    ctx.sheet_name,
                    ctx.excel_row,
                    &format!(
                        "\"{}\"的值对AI/AO模块无效 (模块类型: {})，允许的值为: {}",
                        c::WIRING_SYSTEM_COL,
                        module_type,
                        c::ALLOWED_WIRING_SYSTEM_VALUES_AI_AO.join(", ")
                    ),
                    None,
                    Some(c::WIRING_SYSTEM_COL),
                    Some(actual),
                )];
            }
        } else if module_type == c::MODULE_TYPE_DI || module_type == c::MODULE_TYPE_DO {
            if !c::ALLOWED_WIRING_SYSTEM_VALUES_DI_DO.contains(&actual) {
                return vec![format_error(
                    ctx.sheet_name,
                    ctx.excel_row,
                    &format!(
                        "\"{}\"的值对DI/DO模块无效 (模块类型: {})，允许的值为: {}",
                        c::WIRING_SYSTEM_COL,
                        module_type,
                        c::ALLOWED_WIRING_SYSTEM_VALUES_DI_DO.join(", ")
                    ),
                    None,
                    Some(c::WIRING_SYSTEM_COL),
                    Some(actual),
                )];
            }
        } else if module_type.is_empty() {
            return vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!(
                    "\"{}\"为空，无法确定\"{}\"的有效值，请填写模块类型",
                    c::MODULE_TYPE_COL,
                    c::WIRING_SYSTEM_COL
                ),
                None,
                Some(c::MODULE_TYPE_COL),
                None,
            )];
        }
        Vec::new()
    }
}

/// 非预留AI点位的量程上下限必填
pub struct RangeRequiredAiRule;

impl ValidationRule for RangeRequiredAiRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        let mut errors = Vec::new();
        if ctx.is_reserved() || ctx.module_type != c::MODULE_TYPE_AI {
            return errors;
        }
        for column in [c::RANGE_LOW_LIMIT_COL, c::RANGE_HIGH_LIMIT_COL] {
            if !is_value_present(ctx.get(column)) {
                errors.push(format_error(
                    ctx.sheet_name,
                    ctx.excel_row,
                    &format!("该行为非预留点位AI模块，但\"{}\"为空，此列必填", column),
                    None,
                    Some(column),
                    None,
                ));
            }
        }
        errors
    }
}

/// 指定列的值（若填写）必须为数字
fn numeric_check(ctx: &RowContext, column: &'static str) -> Vec<String> {
    let value = ctx.get(column);
    if is_value_present(value) && !is_numeric(value) {
        vec![format_error(
            ctx.sheet_name,
            ctx.excel_row,
            &format!("\"{}\"的值无效，必须为整数或小数", column),
            None,
            Some(column),
            Some(value),
        )]
    } else {
        Vec::new()
    }
}

/// 非预留AI点位的量程（若填写）必须为数字
pub struct RangeNumericAiRule {
    pub column: &'static str,
}

impl ValidationRule for RangeNumericAiRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if !ctx.is_reserved() && ctx.module_type == c::MODULE_TYPE_AI {
            numeric_check(ctx, self.column)
        } else {
            Vec::new()
        }
    }
}

/// 非预留AI点位的报警设定值（若填写）必须为数字
pub struct SetpointNumericAiRule {
    pub column: &'static str,
}

impl ValidationRule for SetpointNumericAiRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if !ctx.is_reserved() && ctx.module_type == c::MODULE_TYPE_AI {
            numeric_check(ctx, self.column)
        } else {
            Vec::new()
        }
    }
}

/// 预留AI点位的量程与设定值相关列必须为空
pub struct ReservedAiSpecificEmptyRule {
    pub column: &'static str,
}

impl ValidationRule for ReservedAiSpecificEmptyRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if !(ctx.is_reserved() && ctx.module_type == c::MODULE_TYPE_AI) {
            return Vec::new();
        }
        let value = ctx.get(self.column);
        if is_value_present(value) {
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!(
                    "该行为预留点位(模块类型: {})，但\"{}\"不为空，预留点位的此列必须为空",
                    ctx.module_type, self.column
                ),
                None,
                Some(self.column),
                Some(value),
            )]
        } else {
            Vec::new()
        }
    }
}

// --- 第三方表规则 ---

/// REAL类型点位的SLL/SL/SH/SHH设定值最多填一个
pub struct RealSetpointUniquenessRule;

impl ValidationRule for RealSetpointUniquenessRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.data_type != c::DATA_TYPE_REAL {
            return Vec::new();
        }
        let setpoint_cols = [
            c::TP_INPUT_SLL_SET_COL,
            c::TP_INPUT_SL_SET_COL,
            c::TP_INPUT_SH_SET_COL,
            c::TP_INPUT_SHH_SET_COL,
        ];
        let present: Vec<String> = setpoint_cols
            .iter()
            .filter_map(|col| {
                let value = ctx.get(col);
                if is_value_present(value) {
                    Some(format!("{}='{}'", col, value.trim()))
                } else {
                    None
                }
            })
            .collect();

        if present.len() > 1 {
            vec![format_error(
                ctx.sheet_name,
                ctx.excel_row,
                &format!(
                    "数据类型为REAL的点，其SLL, SL, SH, SHH设定值中存在多个有效值 ({})，一个点在这些列中最多只能有一个有效值",
                    present.join(", ")
                ),
                Some(&ctx.point_name()),
                None,
                None,
            )]
        } else {
            Vec::new()
        }
    }
}

/// BOOL类型点位的四个设定值列必须全部为空
pub struct BoolSetpointEmptyRule;

impl ValidationRule for BoolSetpointEmptyRule {
    fn validate(&self, ctx: &RowContext) -> Vec<String> {
        if ctx.data_type != c::DATA_TYPE_BOOL {
            return Vec::new();
        }
        let mut errors = Vec::new();
        for column in [
            c::TP_INPUT_SLL_SET_COL,
            c::TP_INPUT_SL_SET_COL,
            c::TP_INPUT_SH_SET_COL,
            c::TP_INPUT_SHH_SET_COL,
        ] {
            let value = ctx.get(column);
            if is_value_present(value) {
                errors.push(format_error(
                    ctx.sheet_name,
                    ctx.excel_row,
                    &format!("数据类型为BOOL的点，其设定值列\"{}\"不应填写数据，请清空该单元格", column),
                    Some(&ctx.point_name()),
                    Some(column),
                    Some(value),
                ));
            }
        }
        errors
    }
}

/// 主IO表规则注册表
pub fn main_io_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        // 通用规则
        Box::new(HmiDescriptionConsistencyRule),
        // 针对预留点位
        Box::new(ReservedPointEmptyRule {
            column: c::POWER_SUPPLY_TYPE_COL,
        }),
        Box::new(ReservedPointEmptyRule {
            column: c::WIRING_SYSTEM_COL,
        }),
        // 针对预留AI点位
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::RANGE_LOW_LIMIT_COL,
        }),
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::RANGE_HIGH_LIMIT_COL,
        }),
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::SLL_SET_COL,
        }),
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::SL_SET_COL,
        }),
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::SH_SET_COL,
        }),
        Box::new(ReservedAiSpecificEmptyRule {
            column: c::SHH_SET_COL,
        }),
        // 针对非预留点位
        Box::new(NonReservedRequiredRule {
            column: c::POWER_SUPPLY_TYPE_COL,
        }),
        Box::new(NonReservedRequiredRule {
            column: c::WIRING_SYSTEM_COL,
        }),
        Box::new(PowerSupplyValueRule),
        Box::new(WiringSystemValueRule),
        // 针对非预留AI点位
        Box::new(RangeRequiredAiRule),
        Box::new(RangeNumericAiRule {
            column: c::RANGE_LOW_LIMIT_COL,
        }),
        Box::new(RangeNumericAiRule {
            column: c::RANGE_HIGH_LIMIT_COL,
        }),
        Box::new(SetpointNumericAiRule {
            column: c::SLL_SET_COL,
        }),
        Box::new(SetpointNumericAiRule {
            column: c::SL_SET_COL,
        }),
        Box::new(SetpointNumericAiRule {
            column: c::SH_SET_COL,
        }),
        Box::new(SetpointNumericAiRule {
            column: c::SHH_SET_COL,
        }),
    ]
}

/// 第三方表规则注册表
pub fn third_party_rules() -> Vec<Box<dyn ValidationRule>> {
    vec![
        Box::new(RealSetpointUniquenessRule),
        Box::new(BoolSetpointEmptyRule),
    ]
}
