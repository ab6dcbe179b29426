//! 核心数据结构定义
//!
//! 点位、设备清单条目、模块定义、槽位键、通道地址以及
//! 分配结果等结构体。点位为封闭记录：除分类器写入
//! `signal_type`、分配完成后写入 `assigned_address` 外不再变更。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::enums::{ChannelKind, ModuleKind, SignalKind};

/// 生成默认的唯一ID
fn default_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn default_count() -> u32 {
    1
}

/// 一个逻辑信号点位
///
/// 由提取器从文档行创建，分类器写入信号类型，
/// 分配器在返回的副本上记录最终地址。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IoPoint {
    /// 唯一标识符
    #[serde(default = "default_id")]
    pub id: String,
    /// 仪表位号（如 "PT0101", "HS-01"）
    pub instrument_tag: String,
    /// 点位描述
    pub description: String,
    /// 信号类型
    #[serde(default)]
    pub signal_type: SignalKind,
    /// 量程低限（原始文本）
    pub range_low: Option<String>,
    /// 量程高限（原始文本）
    pub range_high: Option<String>,
    /// 工程单位（如 "MPa", "℃"）
    pub units: Option<String>,
    /// 供电类型（如 "有源", "无源"）
    pub power_supply: Option<String>,
    /// 线制（如 "两线制", "常开"）
    pub wiring: Option<String>,
    /// 低低报设定值
    pub sll_set_value: Option<String>,
    /// 低报设定值
    pub sl_set_value: Option<String>,
    /// 高报设定值
    pub sh_set_value: Option<String>,
    /// 高高报设定值
    pub shh_set_value: Option<String>,
    /// 分配完成后写入的通道地址
    pub assigned_address: Option<ChannelAddress>,
}

impl IoPoint {
    /// 创建一个仅含标识信息的点位，其余字段为空
    pub fn new(
        instrument_tag: impl Into<String>,
        description: impl Into<String>,
        signal_type: SignalKind,
    ) -> Self {
        Self {
            id: default_id(),
            instrument_tag: instrument_tag.into(),
            description: description.into(),
            signal_type,
            range_low: None,
            range_high: None,
            units: None,
            power_supply: None,
            wiring: None,
            sll_set_value: None,
            sl_set_value: None,
            sh_set_value: None,
            shh_set_value: None,
            assigned_address: None,
        }
    }

    /// 返回记录了分配地址的点位副本
    pub fn with_address(mut self, address: ChannelAddress) -> Self {
        self.assigned_address = Some(address);
        self
    }
}

/// 设备清单条目：模块或背板型号及其数量
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceEntry {
    /// 模块型号（如 "LK610", "LK117", "LE5118"）
    pub model: String,
    /// 数量
    #[serde(default = "default_count")]
    pub count: u32,
}

impl DeviceEntry {
    pub fn new(model: impl Into<String>, count: u32) -> Self {
        Self {
            model: model.into(),
            count,
        }
    }

    /// 数量为1的条目
    pub fn single(model: impl Into<String>) -> Self {
        Self::new(model, 1)
    }
}

/// 模块定义（模块库条目）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleDefinition {
    /// 模块型号
    pub model: String,
    /// 模块类型
    pub kind: ModuleKind,
    /// 总通道数
    pub total_channels: u32,
    /// 子通道划分（混合模块及带板载IO的CPU模块）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_channels: Option<BTreeMap<ChannelKind, u32>>,
    /// 是否为主站模块
    #[serde(default)]
    pub is_master: bool,
    /// 固定槽位要求（DP主站必须放在槽位1）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_required: Option<u32>,
    /// 背板可容纳的槽位数
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<u32>,
    /// 模块描述
    #[serde(default)]
    pub description: String,
}

impl ModuleDefinition {
    /// 创建一个基础模块定义
    pub fn new(model: impl Into<String>, kind: ModuleKind, total_channels: u32) -> Self {
        Self {
            model: model.into(),
            kind,
            total_channels,
            sub_channels: None,
            is_master: false,
            slot_required: None,
            slots: None,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_sub_channels(mut self, sub_channels: BTreeMap<ChannelKind, u32>) -> Self {
        self.sub_channels = Some(sub_channels);
        self
    }

    /// 是否带有可分配的IO子通道
    pub fn has_io_sub_channels(&self) -> bool {
        self.sub_channels
            .as_ref()
            .map(|subs| subs.keys().any(|k| k.is_io()))
            .unwrap_or(false)
    }
}

/// 机架槽位键，按 (机架, 槽位) 排序
///
/// 配置映射直接以该结构体为键，替代裸元组。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SlotKey {
    /// 机架ID（1起）
    pub rack_id: u32,
    /// 槽位ID（机架内部1起计数，LE系统CPU占用槽位0）
    pub slot_id: u32,
}

impl SlotKey {
    pub fn new(rack_id: u32, slot_id: u32) -> Self {
        Self { rack_id, slot_id }
    }
}

impl Display for SlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "机架{}槽位{}", self.rack_id, self.slot_id)
    }
}

/// 通道地址
///
/// 规范字符串形式为 `{rack}_{slot}_{kind}_{channel}`。
/// 地址中的槽号为0基显示：槽位0保持0，槽位n（n≥1）记为n-1。
/// 下游工具按该口径解析地址，槽号换算是对外契约的一部分，
/// 只在 [`ChannelAddress::for_slot`] 一处完成。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ChannelAddress {
    /// 机架ID（1起）
    pub rack_id: u32,
    /// 0基槽号（地址显示值）
    pub slot: u32,
    /// 通道类型
    pub kind: ChannelKind,
    /// 通道编号（0起）
    pub channel: u32,
}

impl ChannelAddress {
    /// 以地址显示值直接构造
    pub fn new(rack_id: u32, slot: u32, kind: ChannelKind, channel: u32) -> Self {
        Self {
            rack_id,
            slot,
            kind,
            channel,
        }
    }

    /// 由机架内部槽位号构造，完成0基槽号换算
    pub fn for_slot(rack_id: u32, slot_id: u32, kind: ChannelKind, channel: u32) -> Self {
        let slot = if slot_id == 0 { 0 } else { slot_id - 1 };
        Self {
            rack_id,
            slot,
            kind,
            channel,
        }
    }
}

impl Display for ChannelAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}_{}_{}", self.rack_id, self.slot, self.kind, self.channel)
    }
}

impl FromStr for ChannelAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('_').collect();
        if parts.len() != 4 {
            return Err(format!("无效的通道地址: {}，期望格式 机架_槽位_类型_通道", s));
        }
        let rack_id: u32 = parts[0]
            .parse()
            .map_err(|_| format!("无效的机架号: {}", parts[0]))?;
        if rack_id < 1 {
            return Err(format!("机架号必须从1开始: {}", s));
        }
        let slot: u32 = parts[1]
            .parse()
            .map_err(|_| format!("无效的槽位号: {}", parts[1]))?;
        let kind = ChannelKind::from_str(parts[2])?;
        let channel: u32 = parts[3]
            .parse()
            .map_err(|_| format!("无效的通道编号: {}", parts[3]))?;
        Ok(Self {
            rack_id,
            slot,
            kind,
            channel,
        })
    }
}

/// 设备分组
///
/// 共享同一设备标识的点位集合，组内点位保持到达顺序。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceGroup {
    /// 设备标识（由仪表位号前缀提取）
    pub device_id: String,
    /// 该设备的所有点位
    pub points: Vec<IoPoint>,
    /// 需要的通道类型和数量
    pub required_channels: BTreeMap<SignalKind, usize>,
    /// 是否为DI+DO配对设备（阀门、手操开关等）
    pub is_paired_digital: bool,
}

/// 未能分配的点位及原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnassignedPoint {
    /// 点位ID
    pub point_id: String,
    /// 仪表位号
    pub instrument_tag: String,
    /// 失败原因
    pub reason: String,
}

/// 按信号类型的分配统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindStats {
    /// 该类型的点位数量
    pub point_count: usize,
    /// 成功分配的数量
    pub assigned_count: usize,
}

/// 分配统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSummary {
    /// 输入点位总数
    pub total_points: usize,
    /// 被排除的通讯软点位数量
    pub excluded_count: usize,
    /// 参与分配的点位数量
    pub attempted_count: usize,
    /// 成功分配数量
    pub assigned_count: usize,
    /// 分配失败数量
    pub failed_count: usize,
    /// 按信号类型分组的统计
    pub by_kind: BTreeMap<SignalKind, KindStats>,
}

/// 通道分配结果
///
/// 点位ID到通道地址的映射、未分配清单以及统计信息。
/// 对同一输入重复执行得到完全相同的结果。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    /// 点位ID → 通道地址
    pub assignments: BTreeMap<String, ChannelAddress>,
    /// 未能分配的点位及原因
    pub unassigned: Vec<UnassignedPoint>,
    /// 分配统计
    pub summary: AssignmentSummary,
}

impl AssignmentResult {
    /// 在点位副本上回填分配地址
    pub fn apply_addresses(&self, points: &[IoPoint]) -> Vec<IoPoint> {
        points
            .iter()
            .map(|p| match self.assignments.get(&p.id) {
                Some(addr) => p.clone().with_address(*addr),
                None => p.clone(),
            })
            .collect()
    }
}

/// 点位提取结果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// 提取出的点位
    pub points: Vec<IoPoint>,
    /// 数据行总数
    pub total_rows: usize,
    /// 被排除的通讯软点位行数
    pub excluded_rows: usize,
    /// 因数据问题跳过的行数
    pub skipped_rows: usize,
}
