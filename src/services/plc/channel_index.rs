//! 通道索引
//!
//! 从系统配置枚举全部空闲IO通道，按类型/机架/模块分组，
//! 以确定的顺序（机架升序、槽位升序、通道升序）供分配器
//! 消耗。分配即通过显式的 `take` 操作从索引中移除通道。
//! COM、DP、背板以及无板载IO的CPU模块不进入可分配池，
//! 但以占位地址的形式对外报告。

use std::collections::BTreeMap;

use crate::models::{ChannelAddress, ChannelKind, SlotKey};
use crate::services::plc::rack_model::SystemConfiguration;

/// 索引中的一个空闲通道
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexedChannel {
    /// 所属模块的槽位键（排序依据）
    pub slot: SlotKey,
    /// 模块内通道编号
    pub channel: u32,
    /// 规范通道地址
    pub address: ChannelAddress,
    /// 模块型号
    pub model: String,
}

/// 空闲通道池
///
/// 池内各类型的通道始终保持 (机架, 槽位, 通道) 升序。
#[derive(Debug, Clone, Default)]
pub struct ChannelIndex {
    free: BTreeMap<ChannelKind, Vec<IndexedChannel>>,
    non_assignable: Vec<ChannelAddress>,
}

impl ChannelIndex {
    /// 从系统配置派生通道索引
    pub fn from_configuration(config: &SystemConfiguration) -> Self {
        let mut free: BTreeMap<ChannelKind, Vec<IndexedChannel>> = BTreeMap::new();
        let mut non_assignable = Vec::new();

        for (slot, module) in config.iter_modules() {
            let definition = &module.definition;
            let kind = definition.kind;

            // 纯通讯模块与无板载IO的CPU只记录占位地址
            let placeholder_kind = match kind {
                crate::models::ModuleKind::Dp => Some(ChannelKind::DP),
                crate::models::ModuleKind::Com => Some(ChannelKind::COM),
                crate::models::ModuleKind::Cpu if !definition.has_io_sub_channels() => {
                    Some(ChannelKind::CPU)
                }
                _ => None,
            };
            if let Some(ph) = placeholder_kind {
                non_assignable.push(ChannelAddress::for_slot(slot.rack_id, slot.slot_id, ph, 0));
                continue;
            }

            // 带子通道划分的模块（混合IO模块、带板载IO的CPU）
            if let Some(subs) = &definition.sub_channels {
                for (sub_kind, count) in subs {
                    if !sub_kind.is_io() {
                        continue;
                    }
                    for channel in 0..*count {
                        free.entry(*sub_kind).or_default().push(IndexedChannel {
                            slot,
                            channel,
                            address: ChannelAddress::for_slot(
                                slot.rack_id,
                                slot.slot_id,
                                *sub_kind,
                                channel,
                            ),
                            model: module.model.clone(),
                        });
                    }
                }
                continue;
            }

            // 单一类型IO模块
            if let Some(channel_kind) = kind.bulk_channel_kind() {
                for channel in 0..definition.total_channels {
                    free.entry(channel_kind).or_default().push(IndexedChannel {
                        slot,
                        channel,
                        address: ChannelAddress::for_slot(
                            slot.rack_id,
                            slot.slot_id,
                            channel_kind,
                            channel,
                        ),
                        model: module.model.clone(),
                    });
                }
            } else if definition.total_channels > 0 {
                log::warn!(
                    "模块 {} ({}) 的通道未纳入索引: 类型{}不可分配",
                    module.model,
                    slot,
                    kind
                );
            }
        }

        for channels in free.values_mut() {
            channels.sort();
        }
        non_assignable.sort();

        let index = Self {
            free,
            non_assignable,
        };
        log::info!(
            "通道索引构建完成: {}",
            index
                .free
                .iter()
                .map(|(k, v)| format!("{}={}", k, v.len()))
                .collect::<Vec<_>>()
                .join(", ")
        );
        index
    }

    /// 指定类型的空闲通道数量
    pub fn free_count(&self, kind: ChannelKind) -> usize {
        self.free.get(&kind).map(|v| v.len()).unwrap_or(0)
    }

    /// 按 (机架, 槽位, 通道) 升序遍历指定类型的空闲通道
    pub fn iter_channels(&self, kind: ChannelKind) -> impl Iterator<Item = &IndexedChannel> {
        self.free.get(&kind).into_iter().flatten()
    }

    /// 遍历指定机架内指定类型的空闲通道
    pub fn iter_channels_in_rack(
        &self,
        rack_id: u32,
        kind: ChannelKind,
    ) -> impl Iterator<Item = &IndexedChannel> {
        self.iter_channels(kind)
            .filter(move |c| c.slot.rack_id == rack_id)
    }

    /// 遍历指定模块内指定类型的空闲通道
    pub fn iter_channels_in_module(
        &self,
        module: SlotKey,
        kind: ChannelKind,
    ) -> impl Iterator<Item = &IndexedChannel> {
        self.iter_channels(kind).filter(move |c| c.slot == module)
    }

    /// 指定类型的空闲通道按模块分组，组间按 (机架, 槽位) 升序，
    /// 组内按通道编号升序
    pub fn channels_by_module(&self, kind: ChannelKind) -> Vec<(SlotKey, Vec<IndexedChannel>)> {
        let mut grouped: BTreeMap<SlotKey, Vec<IndexedChannel>> = BTreeMap::new();
        for channel in self.iter_channels(kind) {
            grouped.entry(channel.slot).or_default().push(channel.clone());
        }
        grouped.into_iter().collect()
    }

    /// 取走指定类型的第一个空闲通道
    pub fn take_front(&mut self, kind: ChannelKind) -> Option<IndexedChannel> {
        let channels = self.free.get_mut(&kind)?;
        if channels.is_empty() {
            None
        } else {
            Some(channels.remove(0))
        }
    }

    /// 按地址取走指定通道
    pub fn take_at(&mut self, kind: ChannelKind, address: &ChannelAddress) -> Option<IndexedChannel> {
        let channels = self.free.get_mut(&kind)?;
        let position = channels.iter().position(|c| c.address == *address)?;
        Some(channels.remove(position))
    }

    /// 存在但不可分配的通道占位地址（COM/DP/无板载IO的CPU）
    pub fn non_assignable(&self) -> &[ChannelAddress] {
        &self.non_assignable
    }

    /// 全部类型的空闲通道总数
    pub fn total_free(&self) -> usize {
        self.free.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceEntry;
    use crate::services::plc::catalogue::ModuleCatalogue;
    use crate::services::plc::rack_model::SystemBuilder;

    fn build_index(devices: &[DeviceEntry]) -> ChannelIndex {
        let catalogue = ModuleCatalogue::with_builtin();
        let config = SystemBuilder::new(&catalogue).build(devices).unwrap();
        ChannelIndex::from_configuration(&config)
    }

    #[test]
    fn test_channels_enumerated_in_order() {
        // 槽位2: 8通道AI，槽位3: 8通道AI
        let index = build_index(&[DeviceEntry::new("LK410", 2)]);

        let addresses: Vec<String> = index
            .iter_channels(ChannelKind::AI)
            .map(|c| c.address.to_string())
            .collect();
        assert_eq!(addresses.len(), 16);
        assert_eq!(addresses[0], "1_1_AI_0");
        assert_eq!(addresses[7], "1_1_AI_7");
        assert_eq!(addresses[8], "1_2_AI_0");
        assert_eq!(addresses[15], "1_2_AI_7");
    }

    #[test]
    fn test_take_front_consumes_channel() {
        let mut index = build_index(&[DeviceEntry::single("LK510")]);
        assert_eq!(index.free_count(ChannelKind::AO), 4);

        let taken = index.take_front(ChannelKind::AO).unwrap();
        assert_eq!(taken.address.to_string(), "1_1_AO_0");
        assert_eq!(index.free_count(ChannelKind::AO), 3);
        // 已取走的通道不可重复取
        assert!(index.take_at(ChannelKind::AO, &taken.address).is_none());
    }

    #[test]
    fn test_single_channel_module_disappears_after_take() {
        let catalogue = ModuleCatalogue::with_builtin();
        let mut catalogue = catalogue;
        catalogue.insert(crate::models::ModuleDefinition::new(
            "AI-1CH",
            crate::models::ModuleKind::AI,
            1,
        ));
        let config = SystemBuilder::new(&catalogue)
            .build(&[DeviceEntry::single("AI-1CH")])
            .unwrap();
        let mut index = ChannelIndex::from_configuration(&config);

        assert_eq!(index.free_count(ChannelKind::AI), 1);
        index.take_front(ChannelKind::AI).unwrap();
        assert!(index.channels_by_module(ChannelKind::AI).is_empty());
        assert!(index.take_front(ChannelKind::AI).is_none());
    }

    #[test]
    fn test_non_io_modules_not_indexed_but_reported() {
        let index = build_index(&[
            DeviceEntry::single("LK610"),
            DeviceEntry::single("LK238"),
        ]);

        // DP主站（自动落位）与COM模块只出现在占位清单中
        let placeholders: Vec<String> = index
            .non_assignable()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert!(placeholders.contains(&"1_0_DP_0".to_string()));
        assert!(placeholders.iter().any(|a| a.contains("_COM_")));
        assert_eq!(index.free_count(ChannelKind::DI), 16);
        assert_eq!(index.total_free(), 16);
    }

    #[test]
    fn test_cpu_onboard_sub_channels_indexed() {
        let index = build_index(&[DeviceEntry::single("LE5118")]);

        // 板载4路AI、8路DI，地址槽位为0
        assert_eq!(index.free_count(ChannelKind::AI), 4);
        assert_eq!(index.free_count(ChannelKind::DI), 8);
        let first_ai = index.iter_channels(ChannelKind::AI).next().unwrap();
        assert_eq!(first_ai.address.to_string(), "1_0_AI_0");
        assert!(index.non_assignable().is_empty());
    }

    #[test]
    fn test_mixed_module_partitioned_by_sub_channels() {
        let index = build_index(&[DeviceEntry::single("LE523")]);
        assert_eq!(index.free_count(ChannelKind::DI), 8);
        assert_eq!(index.free_count(ChannelKind::DO), 8);

        let di_first = index.iter_channels(ChannelKind::DI).next().unwrap();
        assert_eq!(di_first.address.to_string(), "1_1_DI_0");
    }

    #[test]
    fn test_channels_by_module_grouping() {
        let index = build_index(&[DeviceEntry::new("LK610", 2)]);
        let groups = index.channels_by_module(ChannelKind::DI);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].0, SlotKey::new(1, 2));
        assert_eq!(groups[1].0, SlotKey::new(1, 3));
        assert_eq!(groups[0].1.len(), 16);
        // 组内通道升序
        assert!(groups[0].1.windows(2).all(|w| w[0].channel < w[1].channel));
    }

    #[test]
    fn test_rebuild_yields_same_multiset() {
        let catalogue = ModuleCatalogue::with_builtin();
        let devices = [
            DeviceEntry::single("LK117"),
            DeviceEntry::new("LK410", 2),
            DeviceEntry::single("LK610"),
        ];
        let config = SystemBuilder::new(&catalogue).build(&devices).unwrap();

        let first: Vec<String> = ChannelIndex::from_configuration(&config)
            .iter_channels(ChannelKind::AI)
            .map(|c| c.address.to_string())
            .collect();
        let second: Vec<String> = ChannelIndex::from_configuration(&config)
            .iter_channels(ChannelKind::AI)
            .map(|c| c.address.to_string())
            .collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_iter_channels_in_rack_and_module() {
        let index = build_index(&[
            DeviceEntry::single("LK117"),
            DeviceEntry::single("LK117"),
            DeviceEntry::new("LK610", 10),
        ]);

        let rack2_count = index.iter_channels_in_rack(2, ChannelKind::DI).count();
        assert_eq!(rack2_count, 16, "第10个模块溢出到机架2");

        let module_count = index
            .iter_channels_in_module(SlotKey::new(1, 2), ChannelKind::DI)
            .count();
        assert_eq!(module_count, 16);
    }
}
