//! 规划流水线
//!
//! 把各服务串成一次完整的批处理：文档提取 → 点位分类 →
//! 机架建模 → 通道索引 → 通道分配。流水线持有模块库与
//! 配置，每次执行都从输入参数重新构建全部派生结构。

use serde::{Deserialize, Serialize};

use crate::models::{AssignmentResult, DeviceEntry, ExtractionReport, IoPoint};
use crate::services::assignment::ChannelAssigner;
use crate::services::document_parser::{Document, PointExtractor};
use crate::services::plc::{ChannelIndex, ModuleCatalogue, SystemBuilder, SystemConfiguration};
use crate::utils::config::PlannerConfig;
use crate::utils::error::AppResult;

/// 一次规划的完整产出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanOutcome {
    /// 点位提取结果
    pub extraction: ExtractionReport,
    /// 构建出的系统配置
    pub system: SystemConfiguration,
    /// 通道分配结果
    pub assignment: AssignmentResult,
    /// 已回填分配地址的点位副本
    pub points: Vec<IoPoint>,
}

/// IO点表规划器
pub struct IoPlanner {
    catalogue: ModuleCatalogue,
    config: PlannerConfig,
}

impl IoPlanner {
    /// 使用内置模块库与默认配置
    pub fn new() -> Self {
        Self {
            catalogue: ModuleCatalogue::with_builtin(),
            config: PlannerConfig::default(),
        }
    }

    pub fn with_config(catalogue: ModuleCatalogue, config: PlannerConfig) -> Self {
        Self { catalogue, config }
    }

    /// 对一份文档和一份设备清单执行一次完整规划
    pub fn plan(&self, document: &Document, devices: &[DeviceEntry]) -> AppResult<PlanOutcome> {
        let extraction = PointExtractor::extract_points(document)?;

        let system = SystemBuilder::new(&self.catalogue).build(devices)?;
        let mut index = ChannelIndex::from_configuration(&system);

        let assigner = ChannelAssigner::from_config(&self.config);
        let assignment = assigner.assign(&extraction.points, &mut index);
        let points = assignment.apply_addresses(&extraction.points);

        Ok(PlanOutcome {
            extraction,
            system,
            assignment,
            points,
        })
    }
}

impl Default for IoPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::document_parser::TableRegion;

    fn document() -> Document {
        let rows = [
            vec!["仪表位号", "检测点名称", "信号范围", "信号类型", "单位"],
            vec!["PT0101", "进口压力", "4~20mA", "AI", "MPa"],
            vec!["PT0102", "出口压力", "4~20mA", "AI", "MPa"],
            vec!["RS-01", "总线网关", "", "RS485", ""],
            vec!["XS0101", "泵运行状态", "", "DI", ""],
        ]
        .iter()
        .map(|row| row.iter().map(|c| c.to_string()).collect())
        .collect();
        Document::new(vec![TableRegion::new(rows)])
    }

    #[test]
    fn test_plan_end_to_end() {
        let planner = IoPlanner::new();
        let devices = [
            DeviceEntry::single("LK410"),
            DeviceEntry::single("LK610"),
        ];
        let outcome = planner.plan(&document(), &devices).unwrap();

        assert_eq!(outcome.extraction.points.len(), 3);
        assert_eq!(outcome.extraction.excluded_rows, 1);
        assert_eq!(outcome.assignment.summary.assigned_count, 3);

        // 地址已回填到点位副本
        let pt = outcome
            .points
            .iter()
            .find(|p| p.instrument_tag == "PT0101")
            .unwrap();
        assert_eq!(
            pt.assigned_address.map(|a| a.to_string()),
            Some("1_1_AI_0".to_string())
        );
        let xs = outcome
            .points
            .iter()
            .find(|p| p.instrument_tag == "XS0101")
            .unwrap();
        assert_eq!(
            xs.assigned_address.map(|a| a.to_string()),
            Some("1_2_DI_0".to_string())
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let planner = IoPlanner::new();
        let devices = [DeviceEntry::single("LK410"), DeviceEntry::single("LK610")];

        let first = planner.plan(&document(), &devices).unwrap();
        // 点位ID由提取过程生成，两次提取的ID不同，但地址序列一致
        let second = planner.plan(&document(), &devices).unwrap();
        let first_addrs: Vec<String> = first
            .points
            .iter()
            .filter_map(|p| p.assigned_address.map(|a| a.to_string()))
            .collect();
        let second_addrs: Vec<String> = second
            .points
            .iter()
            .filter_map(|p| p.assigned_address.map(|a| a.to_string()))
            .collect();
        assert_eq!(first_addrs, second_addrs);
    }
}
