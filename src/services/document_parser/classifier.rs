//! 点位分类器
//!
//! 对提取出的原始行做两类判定：
//! 1. 排除——通讯软点位（走总线协议、不占物理通道）与
//!    分组标题行、图签行；
//! 2. 类型推断——信号类型列非标准时，按关键字从位号、
//!    描述与信号类型的合并文本中推断 AI/DI/DO/AO。
//!
//! 单行数据问题只记日志并跳过，绝不中断整个提取过程。

use once_cell::sync::Lazy;
use std::str::FromStr;

use super::{RawRow, SemanticField};
use crate::models::{IoPoint, SignalKind};
use crate::utils::error::{AppError, AppResult};

/// 通讯软点位的信号类型（总线/协议名）
static COMMUNICATION_TYPES: &[&str] = &[
    "RS485",
    "TCP/IP",
    "MODBUS",
    "PROFIBUS",
    "CAN",
    "HART",
    "ETHERNET",
    "FIELDBUS",
    "DEVICENET",
    "FOUNDATION",
];

/// 通讯点位的位号前缀
static COMMUNICATION_TAG_PREFIXES: &[&str] = &["RS-", "GT-", "COMM-", "NET-"];

/// 分组标题行使用的系统名称
static GROUP_HEADING_NAMES: &[&str] =
    &["BPCS", "ESD", "RS485", "DCS", "SIS", "F&G", "FIRE", "GAS"];

/// 图签行关键字（设计、审核等签字栏）
static SIGN_OFF_KEYWORDS: &[&str] = &["设计", "审核", "校对", "批准", "设 计", "审 核"];

/// 类型推断关键字表，按 AI → DI → DO → AO 的固定顺序匹配
static KIND_KEYWORDS: Lazy<Vec<(SignalKind, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            SignalKind::AI,
            vec![
                "压力", "温度", "流量", "液位", "4-20MA", "0-10V", "PRESSURE", "TEMPERATURE",
                "FLOW", "LEVEL",
            ],
        ),
        (
            SignalKind::DI,
            vec![
                "状态", "故障", "报警", "开关", "干接点", "开关量", "STATE", "FAULT", "ALARM",
                "SWITCH", "DRY-CONTACT",
            ],
        ),
        (
            SignalKind::DO,
            vec![
                "控制", "启动", "停止", "阀门", "继电器", "0/24VDC", "CONTROL", "START", "STOP",
                "VALVE", "RELAY",
            ],
        ),
        (
            SignalKind::AO,
            vec![
                "设定", "输出", "调节", "4-20MA输出", "0-10V输出", "SETPOINT", "OUTPUT",
            ],
        ),
    ]
});

/// 单行分类结果
#[derive(Debug, Clone, PartialEq)]
pub enum RowClassification {
    /// 有效的硬点位
    Point(IoPoint),
    /// 通讯软点位，不占用物理通道
    Communication,
    /// 分组标题或图签行
    Heading,
}

/// 点位分类器
pub struct Classifier;

impl Classifier {
    /// 分类一个原始数据行
    ///
    /// 位号与描述均为空时返回 `AmbiguousRow` 错误，由调用方
    /// 记日志并跳过该行。
    pub fn classify_row(row: &RawRow) -> AppResult<RowClassification> {
        let tag = row.get(SemanticField::InstrumentTag);
        let description = row.get(SemanticField::Description);
        let signal_text = row.get(SemanticField::SignalType);

        if tag.is_empty() && description.is_empty() {
            return Err(AppError::AmbiguousRow {
                row_number: row.row_number,
            });
        }

        if Self::is_heading(tag, description) {
            log::debug!("跳过标题行: {} | {}", tag, description);
            return Ok(RowClassification::Heading);
        }

        if Self::is_communication(tag, signal_text) {
            log::debug!("跳过通讯软点位: {} ({})", tag, signal_text);
            return Ok(RowClassification::Communication);
        }

        let signal_type = Self::infer_kind(tag, description, signal_text);

        let mut point = IoPoint::new(tag, description, signal_type);
        let (range_low, range_high) = Self::parse_range(row.get(SemanticField::DataRange));
        point.range_low = range_low;
        point.range_high = range_high;
        point.units = non_empty(row.get(SemanticField::Units));
        point.power_supply = non_empty(row.get(SemanticField::PowerSupply));

        Ok(RowClassification::Point(point))
    }

    /// 是否为通讯软点位
    pub fn is_communication(tag: &str, signal_text: &str) -> bool {
        let signal_upper = signal_text.trim().to_uppercase();
        if !signal_upper.is_empty() {
            if COMMUNICATION_TYPES.contains(&signal_upper.as_str()) {
                return true;
            }
            if COMMUNICATION_TYPES.iter().any(|t| signal_upper.contains(t)) {
                return true;
            }
        }

        let tag_upper = tag.trim().to_uppercase();
        COMMUNICATION_TAG_PREFIXES
            .iter()
            .any(|prefix| tag_upper.starts_with(prefix))
    }

    /// 是否为分组标题行或图签行
    fn is_heading(tag: &str, description: &str) -> bool {
        let tag_upper = tag.trim().to_uppercase();
        if GROUP_HEADING_NAMES.contains(&tag_upper.as_str()) && description.trim().is_empty() {
            return true;
        }
        SIGN_OFF_KEYWORDS
            .iter()
            .any(|kw| tag.contains(kw) || description.contains(kw))
    }

    /// 推断信号类型
    ///
    /// 信号类型列为标准取值时直接采用；否则对位号、描述与
    /// 信号类型的合并文本做关键字匹配。
    pub fn infer_kind(tag: &str, description: &str, signal_text: &str) -> SignalKind {
        let canonical = SignalKind::from_str(signal_text).unwrap_or(SignalKind::Unknown);
        if canonical.is_bulk() {
            return canonical;
        }

        let combined = format!("{} {} {}", tag, description, signal_text).to_uppercase();
        for (kind, keywords) in KIND_KEYWORDS.iter() {
            if keywords.iter().any(|kw| combined.contains(kw)) {
                return *kind;
            }
        }

        SignalKind::Unknown
    }

    /// 解析数据范围文本为上下限（如 "0~100"、"-20~80"）
    fn parse_range(text: &str) -> (Option<String>, Option<String>) {
        let text = text.trim();
        if text.is_empty() {
            return (None, None);
        }
        let separated = text
            .split_once('~')
            .or_else(|| text.split_once('～'))
            .or_else(|| {
                // 负数下限以'-'开头，不能当作分隔符
                if text.starts_with('-') {
                    None
                } else {
                    text.split_once('-')
                }
            });
        match separated {
            Some((low, high)) if !low.trim().is_empty() && !high.trim().is_empty() => (
                Some(low.trim().to_string()),
                Some(high.trim().to_string()),
            ),
            _ => (None, None),
        }
    }
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
