//! 规划器配置管理模块
//!
//! 提供统一的配置结构与加载接口：配置文件（JSON）加载、
//! 环境变量覆盖、默认值与有效性验证。配置只在构造各服务
//! 时读取一次，分配过程本身不回查任何全局配置。

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::utils::error::{AppError, AppResult};

/// 规划器主配置结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// 通道分配配置
    #[serde(default)]
    pub assignment: AssignmentSettings,
    /// 设备分组配置
    #[serde(default)]
    pub grouping: GroupingSettings,
}

/// 通道分配配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentSettings {
    /// 是否启用DI+DO配对设备的机架亲和预分配
    /// 默认关闭，保证模块内连续分配不受干扰
    #[serde(default)]
    pub paired_rack_affinity: bool,
}

/// 设备分组配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingSettings {
    /// 配对设备识别关键词（阀门、手操开关类设备）
    #[serde(default = "default_paired_keywords")]
    pub paired_keywords: Vec<String>,
    /// 配对设备的最小点位数
    #[serde(default = "default_min_paired_points")]
    pub min_paired_points: usize,
    /// 配对设备的最大点位数
    #[serde(default = "default_max_paired_points")]
    pub max_paired_points: usize,
}

fn default_paired_keywords() -> Vec<String> {
    ["阀", "阀门", "VALVE", "XV", "HV", "PV", "CV"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_min_paired_points() -> usize {
    2
}

fn default_max_paired_points() -> usize {
    6
}

impl Default for AssignmentSettings {
    fn default() -> Self {
        Self {
            paired_rack_affinity: false,
        }
    }
}

impl Default for GroupingSettings {
    fn default() -> Self {
        Self {
            paired_keywords: default_paired_keywords(),
            min_paired_points: default_min_paired_points(),
            max_paired_points: default_max_paired_points(),
        }
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            assignment: AssignmentSettings::default(),
            grouping: GroupingSettings::default(),
        }
    }
}

/// 配置管理器
/// 负责配置的加载、保存和环境变量覆盖
pub struct ConfigManager {
    config: PlannerConfig,
    config_file_path: PathBuf,
}

impl ConfigManager {
    /// 创建新的配置管理器
    pub fn new(config_file_path: PathBuf) -> Self {
        Self {
            config: PlannerConfig::default(),
            config_file_path,
        }
    }

    /// 从文件加载配置
    /// 配置文件不存在时写出默认配置文件
    pub fn load_from_file(&mut self) -> AppResult<()> {
        if !self.config_file_path.exists() {
            self.save_to_file()?;
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.config_file_path)
            .map_err(|e| AppError::io_error(format!("读取配置文件失败: {}", e), format!("{:?}", e.kind())))?;

        self.config = serde_json::from_str(&content)
            .map_err(|e| AppError::configuration_error(format!("解析配置文件失败: {}", e)))?;

        Ok(())
    }

    /// 将配置保存到文件
    pub fn save_to_file(&self) -> AppResult<()> {
        if let Some(parent) = self.config_file_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::io_error(format!("创建配置目录失败: {}", e), format!("{:?}", e.kind())))?;
        }

        let content = serde_json::to_string_pretty(&self.config)?;

        std::fs::write(&self.config_file_path, content)
            .map_err(|e| AppError::io_error(format!("写入配置文件失败: {}", e), format!("{:?}", e.kind())))?;

        Ok(())
    }

    /// 从环境变量覆盖配置
    pub fn override_from_env(&mut self) {
        if let Ok(value) = std::env::var("IO_PLANNER_PAIRED_RACK_AFFINITY") {
            if let Ok(flag) = value.parse::<bool>() {
                log::info!("环境变量覆盖配对机架亲和配置: {}", flag);
                self.config.assignment.paired_rack_affinity = flag;
            } else {
                log::warn!("环境变量 IO_PLANNER_PAIRED_RACK_AFFINITY 取值无效: {}", value);
            }
        }
    }

    /// 验证配置的有效性
    pub fn validate_config(&self) -> AppResult<()> {
        let grouping = &self.config.grouping;
        if grouping.min_paired_points == 0 {
            return Err(AppError::configuration_error("配对设备最小点位数必须大于0"));
        }
        if grouping.min_paired_points > grouping.max_paired_points {
            return Err(AppError::configuration_error(format!(
                "配对设备点位数区间无效: {} > {}",
                grouping.min_paired_points, grouping.max_paired_points
            )));
        }
        Ok(())
    }

    /// 获取当前配置
    pub fn get_config(&self) -> &PlannerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_planner_config_defaults() {
        let config = PlannerConfig::default();
        assert!(!config.assignment.paired_rack_affinity);
        assert_eq!(config.grouping.min_paired_points, 2);
        assert_eq!(config.grouping.max_paired_points, 6);
        assert!(config.grouping.paired_keywords.iter().any(|k| k == "VALVE"));
    }

    #[test]
    fn test_config_manager_creates_default_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config/planner.json");

        let mut manager = ConfigManager::new(path.clone());
        manager.load_from_file().unwrap();

        assert!(path.exists(), "不存在的配置文件应被写出默认值");
        assert!(!manager.get_config().assignment.paired_rack_affinity);
    }

    #[test]
    fn test_config_manager_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("planner.json");

        std::fs::write(
            &path,
            r#"{"assignment": {"paired_rack_affinity": true}, "grouping": {}}"#,
        )
        .unwrap();

        let mut manager = ConfigManager::new(path);
        manager.load_from_file().unwrap();
        assert!(manager.get_config().assignment.paired_rack_affinity);
        // 未填写的分组配置回退到默认值
        assert_eq!(manager.get_config().grouping.max_paired_points, 6);
    }

    #[test]
    fn test_validate_config_rejects_bad_interval() {
        let mut manager = ConfigManager::new(PathBuf::from("unused.json"));
        manager.config.grouping.min_paired_points = 8;
        manager.config.grouping.max_paired_points = 4;
        assert!(manager.validate_config().is_err());
    }
}
