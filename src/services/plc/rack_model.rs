//! PLC机架模型
//!
//! 根据设备清单构建系统配置：判定系统类型（LK总线式 /
//! LE_CPU一体式）、计算机架数量、把模块落位到槽位，并校验
//! 槽位规则。机架模型构建一次，之后只读。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DeviceEntry, ModuleDefinition, ModuleKind, SlotKey, SystemType};
use crate::services::plc::catalogue::ModuleCatalogue;
use crate::utils::error::{AppError, AppResult};

/// 默认每机架槽位数（LK117为11槽背板）
pub const DEFAULT_SLOTS_PER_RACK: u32 = 11;

/// LE系统CPU模块的型号
pub const LE_CPU_MODEL: &str = "LE5118";

/// DP主站模块的默认型号
pub const DP_MASTER_MODEL: &str = "PROFIBUS-DP";

/// 安装在槽位上的模块实例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstalledModule {
    /// 模块型号
    pub model: String,
    /// 模块定义（构建时从模块库解析）
    pub definition: ModuleDefinition,
}

/// 一个机架及其槽位占用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rack {
    /// 机架ID（1起）
    pub rack_id: u32,
    /// 总槽位数
    pub total_slots: u32,
    /// 所属系统类型
    pub system_type: SystemType,
    /// 槽位占用，键为机架内部槽位号
    pub slots: BTreeMap<u32, InstalledModule>,
}

impl Rack {
    fn new(rack_id: u32, total_slots: u32, system_type: SystemType) -> Self {
        Self {
            rack_id,
            total_slots,
            system_type,
            slots: BTreeMap::new(),
        }
    }

    /// 从起始槽位开始的第一个空槽位
    fn first_free_slot(&self, start: u32) -> Option<u32> {
        (start..self.total_slots).find(|s| !self.slots.contains_key(s))
    }

    fn install(&mut self, slot_id: u32, module: InstalledModule) -> AppResult<()> {
        if slot_id >= self.total_slots {
            return Err(AppError::placement_error(
                self.rack_id,
                slot_id,
                format!("槽位号超出范围，机架共{}个槽位", self.total_slots),
            ));
        }
        if self.slots.contains_key(&slot_id) {
            return Err(AppError::placement_error(
                self.rack_id,
                slot_id,
                format!("槽位已被占用，无法放置模块 {}", module.model),
            ));
        }
        self.slots.insert(slot_id, module);
        Ok(())
    }
}

/// 系统配置：系统类型与有序机架列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfiguration {
    /// 系统类型
    pub system_type: SystemType,
    /// 机架列表，按机架ID升序
    pub racks: Vec<Rack>,
}

impl SystemConfiguration {
    /// 查询指定槽位上的模块
    pub fn module_at(&self, key: &SlotKey) -> Option<&InstalledModule> {
        self.racks
            .iter()
            .find(|r| r.rack_id == key.rack_id)
            .and_then(|r| r.slots.get(&key.slot_id))
    }

    /// 按 (机架, 槽位) 升序遍历所有已安装模块
    pub fn iter_modules(&self) -> impl Iterator<Item = (SlotKey, &InstalledModule)> {
        self.racks.iter().flat_map(|rack| {
            rack.slots
                .iter()
                .map(move |(slot_id, module)| (SlotKey::new(rack.rack_id, *slot_id), module))
        })
    }

    /// 系统中CPU模块的数量
    pub fn cpu_count(&self) -> usize {
        self.iter_modules()
            .filter(|(_, m)| m.definition.kind == ModuleKind::Cpu)
            .count()
    }

    /// 校验系统配置的关键槽位规则
    pub fn validate(&self) -> AppResult<()> {
        if self.cpu_count() > 1 {
            return Err(AppError::configuration_error("系统中最多只能有一个CPU模块"));
        }

        match self.system_type {
            SystemType::LeCpu => {
                if self.racks.len() != 1 {
                    return Err(AppError::configuration_error(format!(
                        "LE_CPU系统只能有1个机架，当前为{}个",
                        self.racks.len()
                    )));
                }
                let rack = &self.racks[0];
                match rack.slots.get(&0) {
                    Some(module)
                        if module.definition.kind == ModuleKind::Cpu
                            && module.model.to_uppercase() == LE_CPU_MODEL => {}
                    Some(module) => {
                        return Err(AppError::configuration_error(format!(
                            "机架{}槽位0必须配置{} CPU模块，当前为{}",
                            rack.rack_id, LE_CPU_MODEL, module.model
                        )))
                    }
                    None => {
                        return Err(AppError::configuration_error(format!(
                            "机架{}槽位0未配置CPU模块",
                            rack.rack_id
                        )))
                    }
                }
            }
            SystemType::LkBus => {
                for rack in &self.racks {
                    match rack.slots.get(&1) {
                        Some(module) if module.definition.kind == ModuleKind::Dp => {}
                        Some(module) => {
                            return Err(AppError::configuration_error(format!(
                                "机架{}槽位1必须配置DP主站模块，当前为{}",
                                rack.rack_id, module.model
                            )))
                        }
                        None => {
                            return Err(AppError::configuration_error(format!(
                                "机架{}槽位1未配置DP主站模块",
                                rack.rack_id
                            )))
                        }
                    }
                    if rack.slots.contains_key(&0) {
                        return Err(AppError::configuration_error(format!(
                            "机架{}槽位0不放用户模块",
                            rack.rack_id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// 系统构建器：设备清单 → 系统配置
pub struct SystemBuilder<'a> {
    catalogue: &'a ModuleCatalogue,
}

impl<'a> SystemBuilder<'a> {
    pub fn new(catalogue: &'a ModuleCatalogue) -> Self {
        Self { catalogue }
    }

    /// 校验模块能否放置到指定机架槽位
    pub fn validate_module_placement(
        system_type: SystemType,
        rack_id: u32,
        slot_id: u32,
        definition: &ModuleDefinition,
    ) -> AppResult<()> {
        if definition.kind == ModuleKind::Backplane {
            return Err(AppError::placement_error(
                rack_id,
                slot_id,
                format!("背板模块 {} 不能作为可配置模块放入槽位", definition.model),
            ));
        }

        match system_type {
            SystemType::LeCpu => {
                if slot_id == 0 {
                    if !(definition.kind == ModuleKind::Cpu
                        && definition.model.to_uppercase() == LE_CPU_MODEL)
                    {
                        return Err(AppError::placement_error(
                            rack_id,
                            slot_id,
                            format!(
                                "LE系统槽位0只能放置{} CPU模块，尝试放置{}",
                                LE_CPU_MODEL, definition.model
                            ),
                        ));
                    }
                } else if definition.kind == ModuleKind::Cpu {
                    return Err(AppError::placement_error(
                        rack_id,
                        slot_id,
                        format!("CPU模块 {} 只能放置在槽位0", definition.model),
                    ));
                }
            }
            SystemType::LkBus => {
                if definition.kind == ModuleKind::Dp {
                    if slot_id != 1 {
                        return Err(AppError::placement_error(
                            rack_id,
                            slot_id,
                            format!("DP主站模块 {} 只能放置在槽位1", definition.model),
                        ));
                    }
                } else if slot_id == 1 {
                    return Err(AppError::placement_error(
                        rack_id,
                        slot_id,
                        format!("LK系统槽位1只能放置DP主站模块，不能放置{}", definition.model),
                    ));
                } else if slot_id == 0 {
                    return Err(AppError::placement_error(
                        rack_id,
                        slot_id,
                        "LK系统槽位0不放用户模块",
                    ));
                }
            }
        }
        Ok(())
    }

    /// 按显式的 (机架, 槽位) → 型号 配置构建系统
    ///
    /// 用于UI或项目文件给出的完整落位方案。LK系统要求每个
    /// 机架的槽位1已配置DP主站，LE_CPU系统要求槽位0已配置
    /// CPU模块，否则构建失败。
    pub fn from_placements(
        &self,
        system_type: SystemType,
        placements: &BTreeMap<SlotKey, String>,
    ) -> AppResult<SystemConfiguration> {
        if placements.is_empty() {
            return Err(AppError::input_error("模块配置为空"));
        }

        let mut racks: BTreeMap<u32, Rack> = BTreeMap::new();
        for (key, model) in placements {
            let definition = self.catalogue.lookup(model);
            Self::validate_module_placement(system_type, key.rack_id, key.slot_id, &definition)?;

            let total_slots = DEFAULT_SLOTS_PER_RACK.max(key.slot_id + 1);
            let rack = racks
                .entry(key.rack_id)
                .or_insert_with(|| Rack::new(key.rack_id, total_slots, system_type));
            if key.slot_id >= rack.total_slots {
                rack.total_slots = key.slot_id + 1;
            }
            rack.install(
                key.slot_id,
                InstalledModule {
                    model: definition.model.clone(),
                    definition,
                },
            )?;
        }

        let config = SystemConfiguration {
            system_type,
            racks: racks.into_values().collect(),
        };
        config.validate()?;
        Ok(config)
    }

    /// 根据设备清单构建系统配置
    ///
    /// 清单中出现LE5118即判定为LE_CPU系统；否则机架数等于
    /// 背板条目数（无背板但有其他模块时为1个机架），每个机架
    /// 槽位1自动落位DP主站，用户模块从槽位2起按清单顺序落位。
    pub fn build(&self, devices: &[DeviceEntry]) -> AppResult<SystemConfiguration> {
        if devices.is_empty() {
            return Err(AppError::input_error("设备清单为空"));
        }

        // 解析全部条目并按数量展开（背板按条目计数，不展开）
        let mut backplanes: Vec<ModuleDefinition> = Vec::new();
        let mut dp_modules: Vec<ModuleDefinition> = Vec::new();
        let mut user_modules: Vec<ModuleDefinition> = Vec::new();
        let mut cpu_modules: Vec<ModuleDefinition> = Vec::new();

        for entry in devices {
            let definition = self.catalogue.lookup(&entry.model);
            match definition.kind {
                ModuleKind::Backplane => backplanes.push(definition),
                ModuleKind::Dp => {
                    for _ in 0..entry.count.max(1) {
                        dp_modules.push(definition.clone());
                    }
                }
                ModuleKind::Cpu => {
                    for _ in 0..entry.count.max(1) {
                        cpu_modules.push(definition.clone());
                    }
                }
                _ => {
                    for _ in 0..entry.count.max(1) {
                        user_modules.push(definition.clone());
                    }
                }
            }
        }

        let is_le_system = cpu_modules
            .iter()
            .any(|m| m.model.to_uppercase() == LE_CPU_MODEL);

        if cpu_modules.len() > 1 {
            return Err(AppError::configuration_error(format!(
                "系统中最多只能有一个CPU模块，当前清单包含{}个",
                cpu_modules.len()
            )));
        }

        let config = if is_le_system {
            self.build_le_system(cpu_modules.remove(0), &backplanes, &user_modules, &dp_modules)?
        } else {
            if !cpu_modules.is_empty() {
                return Err(AppError::configuration_error(format!(
                    "LK系统不支持CPU模块 {}",
                    cpu_modules[0].model
                )));
            }
            self.build_lk_system(&backplanes, &dp_modules, &user_modules)?
        };

        config.validate()?;
        log::info!(
            "系统配置构建完成: 类型={}, 机架数={}, 模块数={}",
            config.system_type,
            config.racks.len(),
            config.iter_modules().count()
        );
        Ok(config)
    }

    /// 构建LE_CPU系统：单机架，槽位0为CPU，用户模块从槽位1起
    fn build_le_system(
        &self,
        cpu: ModuleDefinition,
        backplanes: &[ModuleDefinition],
        user_modules: &[ModuleDefinition],
        dp_modules: &[ModuleDefinition],
    ) -> AppResult<SystemConfiguration> {
        if !backplanes.is_empty() {
            log::warn!("LE_CPU系统忽略清单中的{}个背板条目", backplanes.len());
        }

        let mut rack = Rack::new(1, DEFAULT_SLOTS_PER_RACK, SystemType::LeCpu);
        Self::validate_module_placement(SystemType::LeCpu, 1, 0, &cpu)?;
        let cpu_model = cpu.model.clone();
        rack.install(
            0,
            InstalledModule {
                model: cpu_model,
                definition: cpu,
            },
        )?;

        for definition in dp_modules.iter().chain(user_modules.iter()) {
            let slot_id = rack
                .first_free_slot(SystemType::LeCpu.user_start_slot())
                .ok_or_else(|| {
                    AppError::placement_error(
                        rack.rack_id,
                        rack.total_slots - 1,
                        format!("模块 {} 放置失败: 机架槽位已满", definition.model),
                    )
                })?;
            rack.install(
                slot_id,
                InstalledModule {
                    model: definition.model.clone(),
                    definition: definition.clone(),
                },
            )?;
        }

        Ok(SystemConfiguration {
            system_type: SystemType::LeCpu,
            racks: vec![rack],
        })
    }

    /// 构建LK总线式系统
    fn build_lk_system(
        &self,
        backplanes: &[ModuleDefinition],
        dp_modules: &[ModuleDefinition],
        user_modules: &[ModuleDefinition],
    ) -> AppResult<SystemConfiguration> {
        // 机架数等于背板条目数；无背板但有其他模块时为1个机架
        let rack_count = if !backplanes.is_empty() {
            backplanes.len() as u32
        } else if !dp_modules.is_empty() || !user_modules.is_empty() {
            1
        } else {
            return Err(AppError::input_error("设备清单中没有可落位的模块"));
        };

        let slots_per_rack = backplanes
            .first()
            .and_then(|b| b.slots)
            .unwrap_or(DEFAULT_SLOTS_PER_RACK);

        let mut racks: Vec<Rack> = (1..=rack_count)
            .map(|rack_id| Rack::new(rack_id, slots_per_rack, SystemType::LkBus))
            .collect();

        // 槽位1落位DP主站：优先使用清单中的DP模块，不足时自动补齐
        let mut dp_iter = dp_modules.iter();
        for rack in racks.iter_mut() {
            let definition = dp_iter
                .next()
                .cloned()
                .unwrap_or_else(|| self.catalogue.lookup(DP_MASTER_MODEL));
            Self::validate_module_placement(SystemType::LkBus, rack.rack_id, 1, &definition)?;
            rack.install(
                1,
                InstalledModule {
                    model: definition.model.clone(),
                    definition,
                },
            )?;
        }
        let surplus_dp = dp_iter.count();
        if surplus_dp > 0 {
            log::warn!("清单中有{}个多余的DP主站模块未落位", surplus_dp);
        }

        // 用户模块从槽位2起按清单顺序落位，装满一个机架换下一个
        let mut rack_index = 0usize;
        for definition in user_modules {
            let slot_id = loop {
                if rack_index >= racks.len() {
                    return Err(AppError::placement_error(
                        rack_count,
                        slots_per_rack - 1,
                        format!("模块 {} 放置失败: 所有机架槽位已满", definition.model),
                    ));
                }
                match racks[rack_index].first_free_slot(SystemType::LkBus.user_start_slot()) {
                    Some(slot_id) => break slot_id,
                    None => rack_index += 1,
                }
            };
            let rack = &mut racks[rack_index];
            Self::validate_module_placement(SystemType::LkBus, rack.rack_id, slot_id, definition)?;
            rack.install(
                slot_id,
                InstalledModule {
                    model: definition.model.clone(),
                    definition: definition.clone(),
                },
            )?;
        }

        Ok(SystemConfiguration {
            system_type: SystemType::LkBus,
            racks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DeviceEntry;

    fn catalogue() -> ModuleCatalogue {
        ModuleCatalogue::with_builtin()
    }

    #[test]
    fn test_empty_device_list_is_input_error() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let err = builder.build(&[]).unwrap_err();
        assert_eq!(err.error_code(), "INPUT_ERROR");
    }

    #[test]
    fn test_le_cpu_system_detection() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let config = builder
            .build(&[
                DeviceEntry::single("LE5118"),
                DeviceEntry::single("LE5610"),
            ])
            .unwrap();

        assert_eq!(config.system_type, SystemType::LeCpu);
        assert_eq!(config.racks.len(), 1);

        let cpu = config.module_at(&SlotKey::new(1, 0)).expect("槽位0应为CPU");
        assert_eq!(cpu.definition.kind, ModuleKind::Cpu);
        // 用户模块从槽位1开始
        let di = config.module_at(&SlotKey::new(1, 1)).expect("槽位1应有模块");
        assert_eq!(di.definition.kind, ModuleKind::DI);
    }

    #[test]
    fn test_lk_system_rack_count_from_backplanes() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let config = builder
            .build(&[
                DeviceEntry::single("LK117"),
                DeviceEntry::single("LK117"),
                DeviceEntry::single("LK610"),
            ])
            .unwrap();

        assert_eq!(config.system_type, SystemType::LkBus);
        assert_eq!(config.racks.len(), 2);
        // 每个机架槽位1自动落位DP主站
        for rack in &config.racks {
            assert_eq!(
                rack.slots.get(&1).map(|m| m.definition.kind),
                Some(ModuleKind::Dp)
            );
        }
        // 用户模块从槽位2起
        let di = config.module_at(&SlotKey::new(1, 2)).expect("槽位2应有模块");
        assert_eq!(di.model, "LK610");
    }

    #[test]
    fn test_lk_system_without_backplane_gets_one_rack() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let config = builder
            .build(&[DeviceEntry::new("LK410", 2)])
            .unwrap();

        assert_eq!(config.racks.len(), 1);
        assert_eq!(config.module_at(&SlotKey::new(1, 2)).unwrap().model, "LK410");
        assert_eq!(config.module_at(&SlotKey::new(1, 3)).unwrap().model, "LK410");
    }

    #[test]
    fn test_modules_overflow_to_next_rack() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        // 11槽背板去掉槽位0/1后每机架可放9个用户模块
        let config = builder
            .build(&[
                DeviceEntry::single("LK117"),
                DeviceEntry::single("LK117"),
                DeviceEntry::new("LK610", 10),
            ])
            .unwrap();

        assert_eq!(config.racks[0].slots.len(), 10, "机架1: DP + 9个用户模块");
        // 第10个DI模块溢出到机架2槽位2
        assert_eq!(config.module_at(&SlotKey::new(2, 2)).unwrap().model, "LK610");
    }

    #[test]
    fn test_overflow_beyond_capacity_is_error() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let err = builder
            .build(&[
                DeviceEntry::single("LK117"),
                DeviceEntry::new("LK610", 10),
            ])
            .unwrap_err();
        assert_eq!(err.error_code(), "PLACEMENT_ERROR");
    }

    #[test]
    fn test_duplicate_cpu_is_configuration_error() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let err = builder
            .build(&[DeviceEntry::new("LE5118", 2)])
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_placement_rules() {
        let catalogue = catalogue();
        let dp = catalogue.get("PROFIBUS-DP").unwrap();
        let di = catalogue.get("LK610").unwrap();
        let cpu = catalogue.get("LE5118").unwrap();
        let backplane = catalogue.get("LK117").unwrap();

        // DP只能放LK系统槽位1
        assert!(SystemBuilder::validate_module_placement(SystemType::LkBus, 1, 1, dp).is_ok());
        assert!(SystemBuilder::validate_module_placement(SystemType::LkBus, 1, 3, dp).is_err());
        // LK槽位1不能放普通模块，槽位0不放用户模块
        assert!(SystemBuilder::validate_module_placement(SystemType::LkBus, 1, 1, di).is_err());
        assert!(SystemBuilder::validate_module_placement(SystemType::LkBus, 1, 0, di).is_err());
        // LE槽位0只能放LE5118，CPU不能放其他槽位
        assert!(SystemBuilder::validate_module_placement(SystemType::LeCpu, 1, 0, cpu).is_ok());
        assert!(SystemBuilder::validate_module_placement(SystemType::LeCpu, 1, 0, di).is_err());
        assert!(SystemBuilder::validate_module_placement(SystemType::LeCpu, 1, 2, cpu).is_err());
        // 背板永远不能落位
        assert!(
            SystemBuilder::validate_module_placement(SystemType::LkBus, 1, 3, backplane).is_err()
        );
    }

    #[test]
    fn test_from_placements_explicit_layout() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let placements: std::collections::BTreeMap<SlotKey, String> = [
            (SlotKey::new(1, 1), "PROFIBUS-DP".to_string()),
            (SlotKey::new(1, 3), "LK610".to_string()),
            (SlotKey::new(2, 1), "PROFIBUS-DP".to_string()),
            (SlotKey::new(2, 3), "LK610".to_string()),
        ]
        .into_iter()
        .collect();

        let config = builder
            .from_placements(SystemType::LkBus, &placements)
            .unwrap();
        assert_eq!(config.racks.len(), 2);
        assert_eq!(config.module_at(&SlotKey::new(2, 3)).unwrap().model, "LK610");
    }

    #[test]
    fn test_from_placements_requires_dp_in_slot1() {
        let catalogue = catalogue();
        let builder = SystemBuilder::new(&catalogue);
        let placements: std::collections::BTreeMap<SlotKey, String> =
            [(SlotKey::new(1, 3), "LK610".to_string())].into_iter().collect();

        let err = builder
            .from_placements(SystemType::LkBus, &placements)
            .unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(err.to_string().contains("槽位1"));
    }

    #[test]
    fn test_validate_detects_missing_dp() {
        let mut rack = Rack::new(1, DEFAULT_SLOTS_PER_RACK, SystemType::LkBus);
        let catalogue = catalogue();
        let di = catalogue.get("LK610").unwrap().clone();
        rack.install(
            2,
            InstalledModule {
                model: di.model.clone(),
                definition: di,
            },
        )
        .unwrap();

        let config = SystemConfiguration {
            system_type: SystemType::LkBus,
            racks: vec![rack],
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("槽位1"));
    }
}
