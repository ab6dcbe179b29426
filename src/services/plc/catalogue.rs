//! 模块库
//!
//! 持有预定义的PLC模块定义并按型号查询。未录入的型号
//! 通过型号前缀表做尽力推断。模块库在构造时一次建好，
//! 由调用方持有并以引用传入各服务，不存在全局缓存。

use std::collections::BTreeMap;

use crate::models::{ChannelKind, ModuleDefinition, ModuleKind};

/// 型号前缀 → 模块类型推断表
///
/// 仅在精确查询失败时使用。表按声明顺序匹配：取最长命中
/// 前缀，长度相同时先声明者优先。表以数据形式暴露，便于
/// 按现场需要调整。
pub const KIND_PREFIX_TABLE: &[(ModuleKind, &[&str])] = &[
    (ModuleKind::Cpu, &["LE5118"]),
    (ModuleKind::AI, &["LK41", "LE5611", "LE531", "LE534"]),
    (ModuleKind::AO, &["LK51", "LE5621", "LE532"]),
    (ModuleKind::AiAo, &["LE533"]),
    (ModuleKind::DI, &["LK61", "LE5610", "LE521"]),
    (ModuleKind::DO, &["LK71", "LE5620", "LE522"]),
    (ModuleKind::DiDo, &["LE523"]),
    (ModuleKind::Dp, &["LK81", "LK82", "PROFIBUS-DP"]),
    (
        ModuleKind::Com,
        &["LK238", "LE5600", "LE5601", "LE540", "LE5401", "LE5403", "LE5404"],
    ),
    (ModuleKind::Backplane, &["LK117"]),
];

/// 各模块类型的默认通道数，用于推断定义
fn default_channels(kind: ModuleKind) -> u32 {
    match kind {
        ModuleKind::AI => 8,
        ModuleKind::AO => 4,
        ModuleKind::DI => 16,
        ModuleKind::DO => 16,
        ModuleKind::DiDo => 16,
        ModuleKind::AiAo => 6,
        _ => 0,
    }
}

fn kind_description(kind: ModuleKind) -> &'static str {
    match kind {
        ModuleKind::Cpu => "中央处理单元",
        ModuleKind::AI => "模拟量输入",
        ModuleKind::AO => "模拟量输出",
        ModuleKind::DI => "数字量输入",
        ModuleKind::DO => "数字量输出",
        ModuleKind::DiDo => "数字量输入/输出",
        ModuleKind::AiAo => "模拟量输入/输出",
        ModuleKind::Dp => "PROFIBUS-DP通讯接口",
        ModuleKind::Com => "通讯模块",
        ModuleKind::Backplane => "扩展背板",
        ModuleKind::Unregistered => "未录入模块",
    }
}

/// 模块库：预定义模块定义的持有者
#[derive(Debug, Clone)]
pub struct ModuleCatalogue {
    modules: BTreeMap<String, ModuleDefinition>,
}

impl ModuleCatalogue {
    /// 创建空模块库
    pub fn new() -> Self {
        Self {
            modules: BTreeMap::new(),
        }
    }

    /// 创建带内置和利时LK/LE系列模块定义的模块库
    pub fn with_builtin() -> Self {
        let mut catalogue = Self::new();
        for def in builtin_modules() {
            catalogue.insert(def);
        }
        catalogue
    }

    /// 录入一个模块定义，型号重复时覆盖
    pub fn insert(&mut self, definition: ModuleDefinition) {
        self.modules
            .insert(definition.model.to_uppercase(), definition);
    }

    /// 精确查询（型号不区分大小写）
    pub fn get(&self, model: &str) -> Option<&ModuleDefinition> {
        self.modules.get(&model.trim().to_uppercase())
    }

    /// 查询模块定义，未录入时返回前缀推断的定义
    pub fn lookup(&self, model: &str) -> ModuleDefinition {
        if let Some(def) = self.get(model) {
            return def.clone();
        }
        log::debug!("型号 {} 未录入，使用前缀推断", model);
        self.infer(model)
    }

    /// 按型号前缀推断模块定义
    pub fn infer(&self, model: &str) -> ModuleDefinition {
        let model_upper = model.trim().to_uppercase();
        let mut matched = ModuleKind::Unregistered;
        let mut matched_len = 0usize;

        for (kind, prefixes) in KIND_PREFIX_TABLE {
            for prefix in *prefixes {
                // 取最长命中前缀，长度相同时先声明者优先
                if model_upper.starts_with(prefix) && prefix.len() > matched_len {
                    matched = *kind;
                    matched_len = prefix.len();
                }
            }
        }

        let total_channels = default_channels(matched);
        // 推断出的混合模块按均分补全子通道划分
        let sub_channels = matched.mixed_parts().map(|(a, b)| {
            let half = total_channels / 2;
            [(a, total_channels - half), (b, half)]
                .into_iter()
                .collect::<BTreeMap<ChannelKind, u32>>()
        });

        ModuleDefinition {
            model: model.trim().to_string(),
            kind: matched,
            total_channels,
            sub_channels,
            is_master: matched == ModuleKind::Dp,
            slot_required: (matched == ModuleKind::Dp).then_some(1),
            slots: (matched == ModuleKind::Backplane).then_some(11),
            description: format!("{} ({})", kind_description(matched), model.trim()),
        }
    }

    /// 按模块类型列出预定义模块
    pub fn modules_by_kind(&self, kind: ModuleKind) -> Vec<&ModuleDefinition> {
        self.modules.values().filter(|m| m.kind == kind).collect()
    }

    /// 预定义模块数量
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleCatalogue {
    fn default() -> Self {
        Self::with_builtin()
    }
}

fn sub(parts: &[(ChannelKind, u32)]) -> BTreeMap<ChannelKind, u32> {
    parts.iter().copied().collect()
}

/// 内置的和利时LK/LE系列模块定义
fn builtin_modules() -> Vec<ModuleDefinition> {
    let mut defs = vec![
        // LK系列IO模块
        ModuleDefinition::new("LK410", ModuleKind::AI, 8)
            .with_description("8通道电压型模拟量输入模块"),
        ModuleDefinition::new("LK411", ModuleKind::AI, 8)
            .with_description("8通道电流型模拟量输入模块"),
        ModuleDefinition::new("LK412", ModuleKind::AI, 6)
            .with_description("6通道隔离模拟量输入模块"),
        ModuleDefinition::new("LK510", ModuleKind::AO, 4)
            .with_description("4通道通道间隔离电压型模拟量输出模块"),
        ModuleDefinition::new("LK511", ModuleKind::AO, 4)
            .with_description("4通道通道间隔离电流型模拟量输出模块"),
        ModuleDefinition::new("LK512", ModuleKind::AO, 8)
            .with_description("8通道电压电流型模拟量输出模块"),
        ModuleDefinition::new("LK610", ModuleKind::DI, 16)
            .with_description("16通道24VDC混型数字量输入模块"),
        ModuleDefinition::new("LK616", ModuleKind::DI, 32)
            .with_description("32通道24VDC混型数字量输入模块"),
        ModuleDefinition::new("LK710", ModuleKind::DO, 16)
            .with_description("16通道10~30VDC源型数字量输出模块"),
        ModuleDefinition::new("LK716", ModuleKind::DO, 32)
            .with_description("32通道24VDC晶体管型数字量输出模块"),
        ModuleDefinition::new("LK720", ModuleKind::DO, 8)
            .with_description("8通道10~265VAC/5~125VDC常开继电器输出模块"),
        // LE系列IO模块
        ModuleDefinition::new("LE5611", ModuleKind::AI, 8)
            .with_description("LE系列8通道模拟量输入模块"),
        ModuleDefinition::new("LE5621", ModuleKind::AO, 4)
            .with_description("LE系列4通道模拟量输出模块"),
        ModuleDefinition::new("LE5610", ModuleKind::DI, 16)
            .with_description("LE系列16通道数字量输入模块"),
        ModuleDefinition::new("LE5620", ModuleKind::DO, 16)
            .with_description("LE系列16通道数字量输出模块"),
        ModuleDefinition::new("LE531", ModuleKind::AI, 8)
            .with_description("LE系列8通道模拟量输入扩展模块"),
        ModuleDefinition::new("LE532", ModuleKind::AO, 4)
            .with_description("LE系列4通道模拟量输出扩展模块"),
        ModuleDefinition::new("LE534", ModuleKind::AI, 8)
            .with_description("LE系列8通道模拟量输入扩展模块"),
        ModuleDefinition::new("LE521", ModuleKind::DI, 16)
            .with_description("LE系列16通道数字量输入扩展模块"),
        ModuleDefinition::new("LE522", ModuleKind::DO, 16)
            .with_description("LE系列16通道数字量输出扩展模块"),
    ];

    // 混合模块与带板载IO的CPU模块
    defs.push(
        ModuleDefinition::new("LE533", ModuleKind::AiAo, 6)
            .with_sub_channels(sub(&[(ChannelKind::AI, 4), (ChannelKind::AO, 2)]))
            .with_description("LE系列4入2出模拟量混合模块"),
    );
    defs.push(
        ModuleDefinition::new("LE523", ModuleKind::DiDo, 16)
            .with_sub_channels(sub(&[(ChannelKind::DI, 8), (ChannelKind::DO, 8)]))
            .with_description("LE系列8入8出数字量混合模块"),
    );
    defs.push(
        ModuleDefinition::new("LE5118", ModuleKind::Cpu, 12)
            .with_sub_channels(sub(&[(ChannelKind::AI, 4), (ChannelKind::DI, 8)]))
            .with_description("LE系列CPU模块（板载4路AI、8路DI）"),
    );

    // 通讯与结构件
    let mut dp = ModuleDefinition::new("PROFIBUS-DP", ModuleKind::Dp, 0)
        .with_description("PROFIBUS-DP通讯接口模块");
    dp.is_master = true;
    dp.slot_required = Some(1);
    defs.push(dp);

    for model in ["LK238", "LE5600", "LE5601", "LE540", "LE5401", "LE5403", "LE5404"] {
        defs.push(ModuleDefinition::new(model, ModuleKind::Com, 0).with_description("通讯模块"));
    }

    let mut backplane =
        ModuleDefinition::new("LK117", ModuleKind::Backplane, 0).with_description("11槽扩展背板");
    backplane.slots = Some(11);
    defs.push(backplane);

    defs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_lookup_case_insensitive() {
        let catalogue = ModuleCatalogue::with_builtin();
        let def = catalogue.get("lk610").expect("内置型号应可查询");
        assert_eq!(def.kind, ModuleKind::DI);
        assert_eq!(def.total_channels, 16);
    }

    #[test]
    fn test_lookup_falls_back_to_inference() {
        let catalogue = ModuleCatalogue::with_builtin();

        // LK41x 前缀 → AI，默认8通道
        let def = catalogue.lookup("LK418");
        assert_eq!(def.kind, ModuleKind::AI);
        assert_eq!(def.total_channels, 8);

        // LK71x 前缀 → DO
        let def = catalogue.lookup("LK719");
        assert_eq!(def.kind, ModuleKind::DO);
        assert_eq!(def.total_channels, 16);
    }

    #[test]
    fn test_inference_longest_prefix_wins() {
        let catalogue = ModuleCatalogue::new();

        // LE5118 同时命中 CPU 前缀 "LE5118" 与 DO 前缀 "LE5620" 不冲突，
        // 但 "LE5118" 比任何短前缀长，应判为CPU
        assert_eq!(catalogue.infer("LE5118").kind, ModuleKind::Cpu);
        // LE5611 命中 AI 前缀
        assert_eq!(catalogue.infer("LE5611-A").kind, ModuleKind::AI);
        // LK117 → 背板，并给出槽位数
        let backplane = catalogue.infer("LK117");
        assert_eq!(backplane.kind, ModuleKind::Backplane);
        assert_eq!(backplane.slots, Some(11));
    }

    #[test]
    fn test_inference_unknown_model() {
        let catalogue = ModuleCatalogue::new();
        let def = catalogue.infer("XYZ-100");
        assert_eq!(def.kind, ModuleKind::Unregistered);
        assert_eq!(def.total_channels, 0);
    }

    #[test]
    fn test_inferred_mixed_module_gets_sub_channels() {
        let catalogue = ModuleCatalogue::new();
        let def = catalogue.infer("LE523-X");
        assert_eq!(def.kind, ModuleKind::DiDo);
        let subs = def.sub_channels.expect("混合模块应补全子通道");
        assert_eq!(subs.get(&ChannelKind::DI), Some(&8));
        assert_eq!(subs.get(&ChannelKind::DO), Some(&8));
    }

    #[test]
    fn test_builtin_cpu_has_onboard_io() {
        let catalogue = ModuleCatalogue::with_builtin();
        let cpu = catalogue.get("LE5118").unwrap();
        assert_eq!(cpu.kind, ModuleKind::Cpu);
        assert!(cpu.has_io_sub_channels());
    }

    #[test]
    fn test_dp_master_slot_requirement() {
        let catalogue = ModuleCatalogue::with_builtin();
        let dp = catalogue.get("PROFIBUS-DP").unwrap();
        assert!(dp.is_master);
        assert_eq!(dp.slot_required, Some(1));
    }

    #[test]
    fn test_modules_by_kind() {
        let catalogue = ModuleCatalogue::with_builtin();
        let ai_modules = catalogue.modules_by_kind(ModuleKind::AI);
        assert!(ai_modules.iter().any(|m| m.model == "LK410"));
        assert!(ai_modules.iter().all(|m| m.kind == ModuleKind::AI));
    }
}
