//! PLC硬件模型：模块库、机架模型与通道索引

/// 模块库
pub mod catalogue;
/// 机架模型
pub mod rack_model;
/// 通道索引
pub mod channel_index;

pub use catalogue::{ModuleCatalogue, KIND_PREFIX_TABLE};
pub use channel_index::{ChannelIndex, IndexedChannel};
pub use rack_model::{
    InstalledModule, Rack, SystemBuilder, SystemConfiguration, DEFAULT_SLOTS_PER_RACK,
    DP_MASTER_MODEL, LE_CPU_MODEL,
};
