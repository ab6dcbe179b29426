//! 通道分配引擎
//!
//! 全局连续分配：过滤通讯软点位后，把硬点位按 AI → DI →
//! DO → AO 的固定顺序分类型处理；每个类型内按 (机架, 槽位)
//! 顺序遍历模块，在模块内部按通道编号升序逐一分配，填满
//! 一个模块再用下一个。分配是纯函数：同样的输入总是产出
//! 同样的映射、未分配清单与统计。
//!
//! 容量不足只产生逐点位的警告性记录，不中断其余分配。

use std::collections::BTreeMap;

use crate::models::{
    AssignmentResult, AssignmentSummary, ChannelKind, DeviceGroup, IoPoint, SignalKind,
    UnassignedPoint,
};
use crate::services::assignment::grouper::Grouper;
use crate::services::plc::channel_index::ChannelIndex;
use crate::utils::config::PlannerConfig;

/// 分配选项
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentOptions {
    /// 配对设备机架亲和预分配（可选，默认关闭）
    ///
    /// 开启后，配对设备组会尝试把DI与DO点位预留在同一机架：
    /// 仅当两个类型池中全局最靠前的空闲通道都落在同一机架时
    /// 才预留，因此不会破坏模块内连续性与模块填充顺序；
    /// 无法满足时整组留给主分配流程。
    pub paired_rack_affinity: bool,
}

/// 通道分配引擎
pub struct ChannelAssigner {
    grouper: Grouper,
    options: AssignmentOptions,
}

impl ChannelAssigner {
    pub fn new() -> Self {
        Self {
            grouper: Grouper::new(),
            options: AssignmentOptions::default(),
        }
    }

    pub fn with_options(options: AssignmentOptions) -> Self {
        Self {
            grouper: Grouper::new(),
            options,
        }
    }

    /// 按配置构建分配引擎
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            grouper: Grouper::with_settings(config.grouping.clone()),
            options: AssignmentOptions {
                paired_rack_affinity: config.assignment.paired_rack_affinity,
            },
        }
    }

    /// 执行一次分配
    ///
    /// 点位的处理顺序由分组器产出的设备组顺序决定；
    /// 索引中的通道被逐个取走，剩余通道保持空闲。
    pub fn assign(&self, points: &[IoPoint], index: &mut ChannelIndex) -> AssignmentResult {
        let mut summary = AssignmentSummary {
            total_points: points.len(),
            ..Default::default()
        };

        // 1. 过滤通讯软点位
        let hard_points: Vec<IoPoint> = points
            .iter()
            .filter(|p| {
                if p.signal_type == SignalKind::Communication {
                    log::debug!("排除通讯软点位: {}", p.instrument_tag);
                    false
                } else {
                    true
                }
            })
            .cloned()
            .collect();
        summary.excluded_count = points.len() - hard_points.len();
        summary.attempted_count = hard_points.len();

        // 2. 设备分组，组序与组内顺序共同决定点位处理顺序
        let groups = self.grouper.group_points(&hard_points);

        let mut assignments: BTreeMap<String, crate::models::ChannelAddress> = BTreeMap::new();
        let mut unassigned: Vec<UnassignedPoint> = Vec::new();

        // 3. 可选的配对设备机架亲和预分配
        if self.options.paired_rack_affinity {
            self.reserve_paired_groups(&groups, index, &mut assignments);
        }

        let ordered: Vec<&IoPoint> = groups.iter().flat_map(|g| g.points.iter()).collect();

        // 4. 主流程：按固定类型顺序做全局连续分配
        for kind in SignalKind::BULK_ORDER {
            let channel_kind = kind
                .channel_kind()
                .expect("硬点类型必有对应通道类型");
            let pending: Vec<&IoPoint> = ordered
                .iter()
                .copied()
                .filter(|p| p.signal_type == kind && !assignments.contains_key(&p.id))
                .collect();
            if pending.is_empty() {
                continue;
            }

            log::info!(
                "连续分配 {} 类型: {} 个点位，可用通道 {} 个",
                kind,
                pending.len(),
                index.free_count(channel_kind)
            );

            let mut point_iter = pending.into_iter();
            let mut exhausted = false;
            for (slot, channels) in index.channels_by_module(channel_kind) {
                for channel in channels {
                    match point_iter.next() {
                        Some(point) => {
                            index.take_at(channel_kind, &channel.address);
                            log::debug!(
                                "分配点位 {} ({}) -> {}",
                                point.instrument_tag,
                                kind,
                                channel.address
                            );
                            assignments.insert(point.id.clone(), channel.address);
                        }
                        None => {
                            exhausted = true;
                            break;
                        }
                    }
                }
                if exhausted {
                    break;
                }
                log::debug!("模块 {} 的 {} 通道已填满", slot, kind);
            }

            // 通道耗尽后剩余的点位逐个记录原因
            for point in point_iter {
                let reason = format!("无可用 {} 通道", kind);
                log::warn!("点位 {} {}", point.instrument_tag, reason);
                unassigned.push(UnassignedPoint {
                    point_id: point.id.clone(),
                    instrument_tag: point.instrument_tag.clone(),
                    reason,
                });
            }
        }

        // 5. 类型未识别的点位无法参与任何类型的分配
        for point in &ordered {
            if point.signal_type == SignalKind::Unknown {
                unassigned.push(UnassignedPoint {
                    point_id: point.id.clone(),
                    instrument_tag: point.instrument_tag.clone(),
                    reason: "信号类型未识别，无法分配通道".to_string(),
                });
            }
        }

        // 6. 统计
        for point in &ordered {
            let stats = summary.by_kind.entry(point.signal_type).or_default();
            stats.point_count += 1;
            if assignments.contains_key(&point.id) {
                stats.assigned_count += 1;
            }
        }
        summary.assigned_count = assignments.len();
        summary.failed_count = unassigned.len();

        log::info!(
            "分配完成: 成功 {} 个，失败 {} 个，排除 {} 个",
            summary.assigned_count,
            summary.failed_count,
            summary.excluded_count
        );

        AssignmentResult {
            assignments,
            unassigned,
            summary,
        }
    }

    /// 配对设备组的机架亲和预分配
    ///
    /// 仅当DI池与DO池的全局最靠前通道都落在同一机架、且数量
    /// 足够时才预留该组；取走的是各池的头部通道，不影响模块
    /// 填充顺序。
    fn reserve_paired_groups(
        &self,
        groups: &[DeviceGroup],
        index: &mut ChannelIndex,
        assignments: &mut BTreeMap<String, crate::models::ChannelAddress>,
    ) {
        for group in groups.iter().filter(|g| g.is_paired_digital) {
            let di_points: Vec<&IoPoint> = group
                .points
                .iter()
                .filter(|p| p.signal_type == SignalKind::DI)
                .collect();
            let do_points: Vec<&IoPoint> = group
                .points
                .iter()
                .filter(|p| p.signal_type == SignalKind::DO)
                .collect();
            if di_points.is_empty() || do_points.is_empty() {
                continue;
            }

            let di_head: Vec<_> = index
                .iter_channels(ChannelKind::DI)
                .take(di_points.len())
                .cloned()
                .collect();
            let do_head: Vec<_> = index
                .iter_channels(ChannelKind::DO)
                .take(do_points.len())
                .cloned()
                .collect();
            if di_head.len() < di_points.len() || do_head.len() < do_points.len() {
                continue;
            }

            let di_rack = di_head[0].slot.rack_id;
            let same_rack = di_head.iter().all(|c| c.slot.rack_id == di_rack)
                && do_head.iter().all(|c| c.slot.rack_id == di_rack);
            if !same_rack {
                log::info!(
                    "配对设备 {} 无法在同一机架预留DI+DO，留给主分配流程",
                    group.device_id
                );
                continue;
            }

            log::info!("配对设备 {} 在机架 {} 内预留DI+DO通道", group.device_id, di_rack);
            for (point, channel) in di_points.iter().zip(di_head.iter()) {
                index.take_at(ChannelKind::DI, &channel.address);
                assignments.insert(point.id.clone(), channel.address);
            }
            for (point, channel) in do_points.iter().zip(do_head.iter()) {
                index.take_at(ChannelKind::DO, &channel.address);
                assignments.insert(point.id.clone(), channel.address);
            }
        }
    }
}

impl Default for ChannelAssigner {
    fn default() -> Self {
        Self::new()
    }
}
