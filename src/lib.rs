//! IO点表通道分配规划库
//!
//! 把工程文档中的信号点位分配到模块化PLC机架的物理IO通道。
//! 数据单向流动：文档提取 → 点位分类 → 设备分组 → 通道分配，
//! 硬件侧由设备清单构建机架模型并派生通道索引。整个分配过程
//! 是单线程批处理，同一输入总是产出同一结果。
//!
//! 分配完成后的点表可交由 [`services::validation`] 的规则引擎
//! 做一致性校验。

/// 核心数据模型模块
pub mod models;
/// 服务层模块
pub mod services;
/// 工具模块
pub mod utils;

pub use models::{
    AssignmentResult, AssignmentSummary, ChannelAddress, ChannelKind, DeviceEntry, DeviceGroup,
    ExtractionReport, IoPoint, KindStats, ModuleDefinition, ModuleKind, SignalKind, SlotKey,
    SystemType, UnassignedPoint,
};
pub use services::assignment::{AssignmentOptions, ChannelAssigner, Grouper};
pub use services::document_parser::{
    Classifier, Document, HeaderDetector, PointExtractor, RawRow, RowClassification,
    SemanticField, TableRegion,
};
pub use services::planner::{IoPlanner, PlanOutcome};
pub use services::plc::{
    ChannelIndex, ModuleCatalogue, SystemBuilder, SystemConfiguration,
};
pub use services::validation::{IoTableValidator, SheetData, WorkbookData};
pub use utils::{AppError, AppResult, ConfigManager, PlannerConfig};
