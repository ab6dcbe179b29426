//! 点表校验相关常量

/// 主IO点表的Sheet名称
pub const PLC_IO_SHEET_NAME: &str = "IO点表";

// --- 主IO点表列名 ---
pub const HMI_NAME_COL: &str = "变量名称（HMI）";
pub const DESCRIPTION_COL: &str = "变量描述";
pub const POWER_SUPPLY_TYPE_COL: &str = "供电类型（有源/无源）";
pub const WIRING_SYSTEM_COL: &str = "线制";
pub const MODULE_TYPE_COL: &str = "模块类型";
pub const RANGE_LOW_LIMIT_COL: &str = "量程低限";
pub const RANGE_HIGH_LIMIT_COL: &str = "量程高限";
pub const SLL_SET_COL: &str = "SLL设定值";
pub const SL_SET_COL: &str = "SL设定值";
pub const SH_SET_COL: &str = "SH设定值";
pub const SHH_SET_COL: &str = "SHH设定值";

// --- 第三方设备点表列名 ---
pub const TP_INPUT_VAR_NAME_COL: &str = "变量名称";
pub const TP_INPUT_DATA_TYPE_COL: &str = "数据类型";
pub const TP_INPUT_SLL_SET_COL: &str = "SLL设定值";
pub const TP_INPUT_SL_SET_COL: &str = "SL设定值";
pub const TP_INPUT_SH_SET_COL: &str = "SH设定值";
pub const TP_INPUT_SHH_SET_COL: &str = "SHH设定值";

// --- 允许值常量 ---
pub const ALLOWED_POWER_SUPPLY_VALUES: &[&str] = &["有源", "无源"];
pub const ALLOWED_WIRING_SYSTEM_VALUES_AI_AO: &[&str] =
    &["2线制", "两线制", "三线制", "四线制", "3线制", "4线制"];
pub const ALLOWED_WIRING_SYSTEM_VALUES_DI_DO: &[&str] = &["常开", "常闭"];

// --- 数据类型常量 ---
pub const DATA_TYPE_REAL: &str = "REAL";
pub const DATA_TYPE_BOOL: &str = "BOOL";

// --- 模块类型常量 ---
pub const MODULE_TYPE_AI: &str = "AI";
pub const MODULE_TYPE_AO: &str = "AO";
pub const MODULE_TYPE_DI: &str = "DI";
pub const MODULE_TYPE_DO: &str = "DO";

/// 主IO点表的必需列
pub const MAIN_REQUIRED_COLS: &[&str] = &[
    HMI_NAME_COL,
    DESCRIPTION_COL,
    POWER_SUPPLY_TYPE_COL,
    WIRING_SYSTEM_COL,
    MODULE_TYPE_COL,
    RANGE_LOW_LIMIT_COL,
    RANGE_HIGH_LIMIT_COL,
    SLL_SET_COL,
    SL_SET_COL,
    SH_SET_COL,
    SHH_SET_COL,
];

/// 第三方点表校验设定值所需的列
pub const TP_REQUIRED_COLS_FOR_SETPOINT_CHECK: &[&str] = &[
    TP_INPUT_VAR_NAME_COL,
    TP_INPUT_DATA_TYPE_COL,
    TP_INPUT_SLL_SET_COL,
    TP_INPUT_SL_SET_COL,
    TP_INPUT_SH_SET_COL,
    TP_INPUT_SHH_SET_COL,
];
