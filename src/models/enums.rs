//! 核心枚举类型定义
//!
//! 信号类型、通道类型、模块类型与系统类型的强类型表示，
//! 替代原始点表数据中的裸字符串。所有枚举支持JSON序列化
//! 以及与字符串的双向转换。

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// 点位信号类型
///
/// 由分类器根据信号类型列或关键字推断得出。
/// `Communication` 表示通讯软点位（不占用物理通道），
/// `Unknown` 表示无法识别的类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalKind {
    /// 模拟量输入
    AI,
    /// 模拟量输出
    AO,
    /// 数字量输入
    DI,
    /// 数字量输出
    DO,
    /// 通讯软点位
    Communication,
    /// 未识别
    Unknown,
}

impl SignalKind {
    /// 四种硬点类型按固定分配顺序排列
    pub const BULK_ORDER: [SignalKind; 4] =
        [SignalKind::AI, SignalKind::DI, SignalKind::DO, SignalKind::AO];

    /// 是否为可分配物理通道的硬点类型
    pub fn is_bulk(&self) -> bool {
        matches!(self, SignalKind::AI | SignalKind::AO | SignalKind::DI | SignalKind::DO)
    }

    /// 对应的通道类型（仅硬点类型有对应关系）
    pub fn channel_kind(&self) -> Option<ChannelKind> {
        match self {
            SignalKind::AI => Some(ChannelKind::AI),
            SignalKind::AO => Some(ChannelKind::AO),
            SignalKind::DI => Some(ChannelKind::DI),
            SignalKind::DO => Some(ChannelKind::DO),
            _ => None,
        }
    }
}

impl Default for SignalKind {
    fn default() -> Self {
        Self::Unknown
    }
}

impl Display for SignalKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignalKind::AI => "AI",
            SignalKind::AO => "AO",
            SignalKind::DI => "DI",
            SignalKind::DO => "DO",
            SignalKind::Communication => "Communication",
            SignalKind::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SignalKind {
    type Err = String;

    /// 非标准取值一律归入 `Unknown`，由分类器继续做关键字推断
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AI" => Ok(SignalKind::AI),
            "AO" => Ok(SignalKind::AO),
            "DI" => Ok(SignalKind::DI),
            "DO" => Ok(SignalKind::DO),
            "COMMUNICATION" => Ok(SignalKind::Communication),
            _ => Ok(SignalKind::Unknown),
        }
    }
}

/// 通道地址中允许出现的通道类型
///
/// 地址字符串形如 `1_2_DI_5`，第三段即为此类型。
/// AI/AO/DI/DO 为可分配的IO通道，CPU/DP/COM 仅用于
/// 标记非IO模块的占位地址。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ChannelKind {
    AI,
    AO,
    DI,
    DO,
    CPU,
    DP,
    COM,
}

impl ChannelKind {
    /// 是否为可分配给点位的IO通道类型
    pub fn is_io(&self) -> bool {
        matches!(self, ChannelKind::AI | ChannelKind::AO | ChannelKind::DI | ChannelKind::DO)
    }
}

impl Display for ChannelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChannelKind::AI => "AI",
            ChannelKind::AO => "AO",
            ChannelKind::DI => "DI",
            ChannelKind::DO => "DO",
            ChannelKind::CPU => "CPU",
            ChannelKind::DP => "DP",
            ChannelKind::COM => "COM",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AI" => Ok(ChannelKind::AI),
            "AO" => Ok(ChannelKind::AO),
            "DI" => Ok(ChannelKind::DI),
            "DO" => Ok(ChannelKind::DO),
            "CPU" => Ok(ChannelKind::CPU),
            "DP" => Ok(ChannelKind::DP),
            "COM" => Ok(ChannelKind::COM),
            _ => Err(format!("无效的通道类型: {}", s)),
        }
    }
}

/// 模块类型
///
/// 描述安装在槽位上的硬件模块，比通道类型多出混合IO、
/// 背板与未录入三类。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ModuleKind {
    /// 模拟量输入模块
    AI,
    /// 模拟量输出模块
    AO,
    /// 数字量输入模块
    DI,
    /// 数字量输出模块
    DO,
    /// 模拟量输入/输出混合模块
    AiAo,
    /// 数字量输入/输出混合模块
    DiDo,
    /// CPU模块（可带板载IO子通道）
    Cpu,
    /// PROFIBUS-DP通讯接口模块
    Dp,
    /// 通讯模块（无可分配IO）
    Com,
    /// 扩展背板
    Backplane,
    /// 未录入模块
    Unregistered,
}

impl ModuleKind {
    /// 是否提供可分配的IO通道
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            ModuleKind::AI
                | ModuleKind::AO
                | ModuleKind::DI
                | ModuleKind::DO
                | ModuleKind::AiAo
                | ModuleKind::DiDo
        )
    }

    /// 单一IO类型模块对应的通道类型
    pub fn bulk_channel_kind(&self) -> Option<ChannelKind> {
        match self {
            ModuleKind::AI => Some(ChannelKind::AI),
            ModuleKind::AO => Some(ChannelKind::AO),
            ModuleKind::DI => Some(ChannelKind::DI),
            ModuleKind::DO => Some(ChannelKind::DO),
            _ => None,
        }
    }

    /// 混合模块的子通道类型组合
    pub fn mixed_parts(&self) -> Option<(ChannelKind, ChannelKind)> {
        match self {
            ModuleKind::AiAo => Some((ChannelKind::AI, ChannelKind::AO)),
            ModuleKind::DiDo => Some((ChannelKind::DI, ChannelKind::DO)),
            _ => None,
        }
    }
}

impl Default for ModuleKind {
    fn default() -> Self {
        Self::Unregistered
    }
}

impl Display for ModuleKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModuleKind::AI => "AI",
            ModuleKind::AO => "AO",
            ModuleKind::DI => "DI",
            ModuleKind::DO => "DO",
            ModuleKind::AiAo => "AI/AO",
            ModuleKind::DiDo => "DI/DO",
            ModuleKind::Cpu => "CPU",
            ModuleKind::Dp => "DP",
            ModuleKind::Com => "COM",
            ModuleKind::Backplane => "RACK",
            ModuleKind::Unregistered => "未录入",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AI" => Ok(ModuleKind::AI),
            "AO" => Ok(ModuleKind::AO),
            "DI" => Ok(ModuleKind::DI),
            "DO" => Ok(ModuleKind::DO),
            "AI/AO" => Ok(ModuleKind::AiAo),
            "DI/DO" => Ok(ModuleKind::DiDo),
            "CPU" => Ok(ModuleKind::Cpu),
            "DP" => Ok(ModuleKind::Dp),
            "COM" => Ok(ModuleKind::Com),
            "RACK" => Ok(ModuleKind::Backplane),
            _ => Ok(ModuleKind::Unregistered),
        }
    }
}

/// PLC系统类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemType {
    /// LK系列总线式系统：每个机架槽位1固定为DP主站模块，
    /// 槽位0不放用户模块，用户模块从槽位2开始
    LkBus,
    /// LE系列CPU一体式系统：单机架，槽位0固定为CPU模块，
    /// 用户模块从槽位1开始
    LeCpu,
}

impl SystemType {
    /// 用户可配置模块的起始槽位
    pub fn user_start_slot(&self) -> u32 {
        match self {
            SystemType::LkBus => 2,
            SystemType::LeCpu => 1,
        }
    }
}

impl Default for SystemType {
    fn default() -> Self {
        Self::LkBus
    }
}

impl Display for SystemType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SystemType::LkBus => "LK",
            SystemType::LeCpu => "LE_CPU",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SystemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "LK" => Ok(SystemType::LkBus),
            "LE_CPU" | "LE" => Ok(SystemType::LeCpu),
            _ => Err(format!("无效的系统类型: {}，支持的类型: LK, LE_CPU", s)),
        }
    }
}
