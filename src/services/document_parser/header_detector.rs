//! 智能表头检测器
//!
//! 识别不同来源IO点表的表头列。每个语义字段维护一张
//! 四层同义词表（主关键字、次关键字、英文别名、正则模式），
//! 分三轮匹配：精确匹配、模糊匹配、位置推断。
//! 每一列最多被一个字段认领，先达到阈值的字段优先。

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};

/// 表头语义字段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SemanticField {
    /// 仪表位号
    InstrumentTag,
    /// 点位描述
    Description,
    /// 信号范围（如 4~20mA）
    SignalRange,
    /// 数据范围（如 0~100）
    DataRange,
    /// 信号类型（如 AI、DI）
    SignalType,
    /// 工程单位
    Units,
    /// 现场仪表供电
    PowerSupply,
    /// 隔离方式
    Isolation,
    /// 备注
    Remarks,
}

impl Display for SemanticField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SemanticField::InstrumentTag => "instrument_tag",
            SemanticField::Description => "description",
            SemanticField::SignalRange => "signal_range",
            SemanticField::DataRange => "data_range",
            SemanticField::SignalType => "signal_type",
            SemanticField::Units => "units",
            SemanticField::PowerSupply => "power_supply",
            SemanticField::Isolation => "isolation",
            SemanticField::Remarks => "remarks",
        };
        write!(f, "{}", s)
    }
}

/// 单个字段的同义词表
struct FieldSynonyms {
    field: SemanticField,
    /// 主关键字（权重最高）
    primary: &'static [&'static str],
    /// 次关键字（权重中等）
    secondary: &'static [&'static str],
    /// 英文别名
    english: &'static [&'static str],
    /// 正则模式（权重最低，仅模糊匹配轮使用）
    patterns: Vec<Regex>,
}

fn patterns(sources: &[&str]) -> Vec<Regex> {
    sources
        .iter()
        .map(|p| Regex::new(&format!("(?i){}", p)).expect("表头模式应为合法正则"))
        .collect()
}

/// 全字段同义词库，字段声明顺序即认领优先级
static FIELD_SYNONYMS: Lazy<Vec<FieldSynonyms>> = Lazy::new(|| {
    vec![
        FieldSynonyms {
            field: SemanticField::InstrumentTag,
            primary: &["位号", "仪表位号", "tag", "TAG"],
            secondary: &["设备位号", "点位号", "标号", "编号", "序号", "测点号", "变量号"],
            english: &["instrument_tag", "device_tag", "point_tag", "NO", "No", "ID"],
            patterns: patterns(&[".*位号.*", ".*tag.*", ".*编号.*", ".*序号.*"]),
        },
        FieldSynonyms {
            field: SemanticField::Description,
            primary: &["名称", "描述", "检测点名称", "description"],
            secondary: &["说明", "功能描述", "测点名称", "点位名称", "变量名称", "仪表名称"],
            english: &["name", "Name", "function", "purpose"],
            patterns: patterns(&[".*名称.*", ".*描述.*", ".*说明.*", ".*检测点.*"]),
        },
        FieldSynonyms {
            field: SemanticField::SignalRange,
            primary: &["信号范围", "信号", "signal"],
            secondary: &["量程", "范围", "输入范围", "测量范围", "信号量程"],
            english: &["range", "signal_range", "input_range"],
            patterns: patterns(&[".*信号.*", ".*量程.*", ".*范围.*"]),
        },
        FieldSynonyms {
            field: SemanticField::DataRange,
            primary: &["数据范围", "工程量", "工程值"],
            secondary: &["测量值", "数值范围", "量程范围", "工程量程", "显示范围"],
            english: &["data_range", "engineering_range", "value_range"],
            patterns: patterns(&[".*数据.*", ".*工程.*", ".*测量值.*"]),
        },
        FieldSynonyms {
            field: SemanticField::SignalType,
            primary: &["信号类型", "类型", "type"],
            secondary: &["IO类型", "通道类型", "输入类型", "输出类型", "接口类型"],
            english: &["signal_type", "io_type", "channel_type"],
            patterns: patterns(&[".*类型.*", ".*Type.*", ".*IO.*"]),
        },
        FieldSynonyms {
            field: SemanticField::Units,
            primary: &["单位", "unit"],
            secondary: &["工程单位", "量纲", "计量单位", "测量单位"],
            english: &["units", "engineering_unit"],
            patterns: patterns(&[".*单位.*", ".*unit.*"]),
        },
        FieldSynonyms {
            field: SemanticField::PowerSupply,
            primary: &["供电", "现场仪表供电", "power"],
            secondary: &["电源", "仪表供电", "供电方式", "电源类型"],
            english: &["power_supply", "supply", "voltage"],
            patterns: patterns(&[".*供电.*", ".*电源.*", ".*power.*"]),
        },
        FieldSynonyms {
            field: SemanticField::Isolation,
            primary: &["隔离", "isolation"],
            secondary: &["隔离器", "安全栅", "隔离方式", "隔离类型"],
            english: &["isolator", "barrier", "safety_barrier"],
            patterns: patterns(&[".*隔离.*", ".*isolation.*"]),
        },
        FieldSynonyms {
            field: SemanticField::Remarks,
            primary: &["备注", "说明", "remarks"],
            secondary: &["注释", "其他", "附注", "补充说明", "特殊说明"],
            english: &["note", "notes", "comment"],
            patterns: patterns(&[".*备注.*", ".*说明.*", ".*note.*"]),
        },
    ]
});

/// 用于定位表头行的关键字集合
pub static HEADER_ROW_KEYWORDS: &[&str] = &[
    "仪表位号",
    "位号",
    "检测点名称",
    "名称",
    "信号类型",
    "信号范围",
    "数据范围",
    "信号",
    "通道类型",
    "量程",
    "单位",
    "现场仪表供电",
    "供电",
    "隔离",
];

/// 表头检测器
pub struct HeaderDetector;

impl HeaderDetector {
    /// 检测表头映射：语义字段 → 列索引
    pub fn detect(header_texts: &[String]) -> BTreeMap<SemanticField, usize> {
        log::debug!("开始检测表头，共 {} 列", header_texts.len());

        let mut mapping: BTreeMap<SemanticField, usize> = BTreeMap::new();
        let mut used_columns: BTreeSet<usize> = BTreeSet::new();

        // 第一轮：精确匹配
        for synonyms in FIELD_SYNONYMS.iter() {
            if let Some((col, score)) =
                Self::find_best_match(header_texts, synonyms, &used_columns, true)
            {
                log::debug!(
                    "精确匹配: '{}' -> {} (列 {}, 得分 {:.2})",
                    header_texts[col],
                    synonyms.field,
                    col,
                    score
                );
                mapping.insert(synonyms.field, col);
                used_columns.insert(col);
            }
        }

        // 第二轮：模糊匹配与模式匹配
        for synonyms in FIELD_SYNONYMS.iter() {
            if mapping.contains_key(&synonyms.field) {
                continue;
            }
            if let Some((col, score)) =
                Self::find_best_match(header_texts, synonyms, &used_columns, false)
            {
                log::debug!(
                    "模糊匹配: '{}' -> {} (列 {}, 得分 {:.2})",
                    header_texts[col],
                    synonyms.field,
                    col,
                    score
                );
                mapping.insert(synonyms.field, col);
                used_columns.insert(col);
            }
        }

        // 第三轮：位置推断。位号通常在第一列，描述在第二列
        if !mapping.contains_key(&SemanticField::InstrumentTag)
            && !used_columns.contains(&0)
            && !header_texts.is_empty()
        {
            log::debug!("位置推断: 第1列 '{}' -> instrument_tag", header_texts[0]);
            mapping.insert(SemanticField::InstrumentTag, 0);
            used_columns.insert(0);
        }
        if !mapping.contains_key(&SemanticField::Description)
            && !used_columns.contains(&1)
            && header_texts.len() > 1
        {
            log::debug!("位置推断: 第2列 '{}' -> description", header_texts[1]);
            mapping.insert(SemanticField::Description, 1);
            used_columns.insert(1);
        }

        log::info!("表头检测完成，识别 {} 个字段", mapping.len());
        mapping
    }

    /// 为字段找到得分最高的未认领列
    fn find_best_match(
        header_texts: &[String],
        synonyms: &FieldSynonyms,
        used_columns: &BTreeSet<usize>,
        exact: bool,
    ) -> Option<(usize, f64)> {
        let mut best: Option<(usize, f64)> = None;

        for (col, text) in header_texts.iter().enumerate() {
            if used_columns.contains(&col) || text.trim().is_empty() {
                continue;
            }
            let score = Self::match_score(text.trim(), synonyms, exact);
            if best.map(|(_, s)| score > s).unwrap_or(score > 0.0) {
                best = Some((col, score));
            }
        }

        let threshold = if exact { 0.8 } else { 0.5 };
        best.filter(|(_, score)| *score >= threshold)
    }

    /// 计算单元格文本对字段的匹配得分 (0~1)
    fn match_score(text: &str, synonyms: &FieldSynonyms, exact: bool) -> f64 {
        let mut score: f64 = 0.0;

        for keyword in synonyms.primary {
            if exact {
                if text == *keyword {
                    score = score.max(1.0);
                } else if text.contains(keyword) {
                    score = score.max(0.9);
                }
            } else {
                let similarity =
                    strsim::normalized_levenshtein(&text.to_lowercase(), &keyword.to_lowercase());
                if similarity > 0.8 {
                    score = score.max(similarity * 0.9);
                }
            }
        }

        for keyword in synonyms.secondary {
            if exact {
                if text.contains(keyword) {
                    score = score.max(0.8);
                }
            } else {
                let similarity =
                    strsim::normalized_levenshtein(&text.to_lowercase(), &keyword.to_lowercase());
                if similarity > 0.7 {
                    score = score.max(similarity * 0.7);
                }
            }
        }

        for keyword in synonyms.english {
            if text.to_lowercase().contains(&keyword.to_lowercase()) {
                score = score.max(0.8);
            }
        }

        if !exact {
            for pattern in &synonyms.patterns {
                if pattern.is_match(text) {
                    score = score.max(0.6);
                }
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(texts: &[&str]) -> Vec<String> {
        texts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_standard_headers() {
        let mapping = HeaderDetector::detect(&headers(&[
            "仪表位号",
            "检测点名称",
            "信号范围",
            "数据范围",
            "信号类型",
            "单位",
            "现场仪表供电",
            "隔离",
            "备注",
        ]));

        assert_eq!(mapping.get(&SemanticField::InstrumentTag), Some(&0));
        assert_eq!(mapping.get(&SemanticField::Description), Some(&1));
        assert_eq!(mapping.get(&SemanticField::SignalRange), Some(&2));
        assert_eq!(mapping.get(&SemanticField::DataRange), Some(&3));
        assert_eq!(mapping.get(&SemanticField::SignalType), Some(&4));
        assert_eq!(mapping.get(&SemanticField::Units), Some(&5));
        assert_eq!(mapping.get(&SemanticField::PowerSupply), Some(&6));
        assert_eq!(mapping.get(&SemanticField::Isolation), Some(&7));
        assert_eq!(mapping.get(&SemanticField::Remarks), Some(&8));
    }

    #[test]
    fn test_each_column_claimed_once() {
        // "信号类型"一列同时命中 signal_range 的"信号"与 signal_type 的
        // 全等关键字，得分更高的全等匹配应把该列留给 signal_type
        let mapping = HeaderDetector::detect(&headers(&["位号", "描述", "信号类型", "信号范围"]));

        assert_eq!(mapping.get(&SemanticField::SignalType), Some(&2));
        assert_eq!(mapping.get(&SemanticField::SignalRange), Some(&3));

        let claimed: Vec<usize> = mapping.values().copied().collect();
        let unique: BTreeSet<usize> = claimed.iter().copied().collect();
        assert_eq!(claimed.len(), unique.len(), "每列最多被一个字段认领");
    }

    #[test]
    fn test_fuzzy_match_case_variant() {
        // "Type" 与主关键字 "type" 大小写不同，精确匹配不命中，
        // 模糊匹配轮按小写相似度1.0认领
        let mapping = HeaderDetector::detect(&headers(&["位号", "描述", "Type"]));
        assert_eq!(mapping.get(&SemanticField::SignalType), Some(&2));
    }

    #[test]
    fn test_positional_inference() {
        let mapping = HeaderDetector::detect(&headers(&["第一列", "第二列", "其他"]));
        assert_eq!(mapping.get(&SemanticField::InstrumentTag), Some(&0));
        assert_eq!(mapping.get(&SemanticField::Description), Some(&1));
    }

    #[test]
    fn test_english_alias_headers() {
        let mapping =
            HeaderDetector::detect(&headers(&["instrument_tag", "description", "io_type"]));
        assert_eq!(mapping.get(&SemanticField::InstrumentTag), Some(&0));
        assert_eq!(mapping.get(&SemanticField::Description), Some(&1));
        assert_eq!(mapping.get(&SemanticField::SignalType), Some(&2));
    }

    #[test]
    fn test_empty_headers_yield_empty_mapping() {
        let mapping = HeaderDetector::detect(&headers(&[]));
        assert!(mapping.is_empty());
    }
}
