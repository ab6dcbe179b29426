//! 设备分组器
//!
//! 按仪表位号前缀把点位归并为设备组，并识别需要DI+DO
//! 配对的设备（阀门、手操开关类）。分组结果的顺序固定：
//! 配对设备优先，其次按点位数降序，最后按设备标识字典序。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::models::{DeviceGroup, IoPoint, SignalKind};
use crate::utils::config::GroupingSettings;

/// 设备标识提取模式，依次尝试
static DEVICE_PREFIX_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^[A-Z]+\d+").expect("设备标识模式应为合法正则"), // 如 FT001, PT002
        Regex::new(r"^\d+[A-Z]+").expect("设备标识模式应为合法正则"), // 如 001FT, 002PT
        Regex::new(r"^[A-Z]+").expect("设备标识模式应为合法正则"),    // 如 FT, PT
    ]
});

/// 设备分组器
pub struct Grouper {
    settings: GroupingSettings,
}

impl Grouper {
    pub fn new() -> Self {
        Self {
            settings: GroupingSettings::default(),
        }
    }

    pub fn with_settings(settings: GroupingSettings) -> Self {
        Self { settings }
    }

    /// 从仪表位号提取设备标识
    ///
    /// 依次尝试前缀模式；都不命中时取首个下划线之前的部分，
    /// 再不行取前四个字符。空位号返回 `None`。
    pub fn extract_device_id(instrument_tag: &str) -> Option<String> {
        let clean_tag = instrument_tag.trim().to_uppercase();
        if clean_tag.is_empty() {
            return None;
        }

        for pattern in DEVICE_PREFIX_PATTERNS.iter() {
            if let Some(matched) = pattern.find(&clean_tag) {
                return Some(matched.as_str().to_string());
            }
        }

        if let Some((head, _)) = clean_tag.split_once('_') {
            if !head.is_empty() {
                return Some(head.to_string());
            }
        }

        Some(clean_tag.chars().take(4).collect())
    }

    /// 把点位流划分为设备组，返回顺序确定的分组列表
    pub fn group_points(&self, points: &[IoPoint]) -> Vec<DeviceGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: HashMap<String, Vec<IoPoint>> = HashMap::new();
        let mut unknown_counter = 0usize;

        for point in points {
            let device_id = match Self::extract_device_id(&point.instrument_tag) {
                Some(id) => id,
                None => {
                    // 无法提取标识的点位各自成组
                    let id = format!("UNKNOWN_{}", unknown_counter);
                    unknown_counter += 1;
                    id
                }
            };
            if !buckets.contains_key(&device_id) {
                order.push(device_id.clone());
            }
            buckets.entry(device_id).or_default().push(point.clone());
        }

        let mut groups: Vec<DeviceGroup> = order
            .into_iter()
            .map(|device_id| {
                let points = buckets.remove(&device_id).unwrap_or_default();
                let mut required_channels = std::collections::BTreeMap::new();
                for point in &points {
                    if point.signal_type.is_bulk() {
                        *required_channels.entry(point.signal_type).or_insert(0) += 1;
                    }
                }
                let is_paired_digital = self.is_paired_digital(&device_id, &points);
                DeviceGroup {
                    device_id,
                    points,
                    required_channels,
                    is_paired_digital,
                }
            })
            .collect();

        // 配对设备优先，点位多者优先，同数按设备标识字典序
        groups.sort_by(|a, b| {
            b.is_paired_digital
                .cmp(&a.is_paired_digital)
                .then(b.points.len().cmp(&a.points.len()))
                .then(a.device_id.cmp(&b.device_id))
        });

        log::info!(
            "设备分组完成: {} 个设备组，其中配对设备 {} 个",
            groups.len(),
            groups.iter().filter(|g| g.is_paired_digital).count()
        );
        groups
    }

    /// 判断是否为DI+DO配对设备
    ///
    /// 命中配对关键词，或同时含有DI与DO点位且总点数落在
    /// 配置区间内。
    fn is_paired_digital(&self, device_id: &str, points: &[IoPoint]) -> bool {
        let device_upper = device_id.to_uppercase();
        for keyword in &self.settings.paired_keywords {
            let keyword_upper = keyword.to_uppercase();
            if device_upper.contains(&keyword_upper) {
                return true;
            }
            for point in points {
                if point.instrument_tag.to_uppercase().contains(&keyword_upper)
                    || point.description.to_uppercase().contains(&keyword_upper)
                {
                    return true;
                }
            }
        }

        let has_di = points.iter().any(|p| p.signal_type == SignalKind::DI);
        let has_do = points.iter().any(|p| p.signal_type == SignalKind::DO);
        has_di
            && has_do
            && points.len() >= self.settings.min_paired_points
            && points.len() <= self.settings.max_paired_points
    }
}

impl Default for Grouper {
    fn default() -> Self {
        Self::new()
    }
}
