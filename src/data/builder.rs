//! 规则库装配器
//! 将松散的原始记录按ID交叉引用，装配为一个不可变的 `Data` 快照
//!
//! 单条记录的问题（类型缺失、正则无效、关联悬空）记录为诊断信息并跳过，
//! 不影响其余记录；重复注册同一ID属于调用方错误，注册时立即返回错误。

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::snapshot::Data;
use crate::error::{RsuResult, RsuadetectorError};
use crate::model::{
    Browser, BrowserOperatingSystemMapping, BrowserType, Device, DeviceCategory, OperatingSystem,
    OperatingSystemFamily, OrderedPattern, Robot, Vendor,
};

/// 正则所属实体
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Browser,
    OperatingSystem,
    Device,
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Browser => write!(f, "browser"),
            PatternKind::OperatingSystem => write!(f, "operating_system"),
            PatternKind::Device => write!(f, "device"),
        }
    }
}

/// 装配诊断（被跳过的记录及原因）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// 浏览器引用了不存在的类型，浏览器被跳过
    MissingBrowserType { browser_id: u32, type_id: u32 },
    /// 浏览器与操作系统的关联无法解析，关联被丢弃
    UnresolvedMapping { browser_id: u32, operating_system_id: u32 },
    /// 同一浏览器存在多条操作系统关联，仅保留第一条
    DuplicateMapping { browser_id: u32, operating_system_id: u32 },
    /// 正则引用了不存在的实体
    OrphanPattern { kind: PatternKind, id: u32, position: u32 },
    /// 正则无法编译
    InvalidPattern { kind: PatternKind, id: u32, position: u32, reason: String },
    /// 其他无法装配的记录
    InvalidRecord { kind: &'static str, id: u32, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::MissingBrowserType { browser_id, type_id } => {
                write!(f, "浏览器 #{} 的类型 #{} 不存在，已跳过", browser_id, type_id)
            }
            Diagnostic::UnresolvedMapping { browser_id, operating_system_id } => write!(
                f,
                "浏览器 #{} 与操作系统 #{} 的关联无法解析，已丢弃",
                browser_id, operating_system_id
            ),
            Diagnostic::DuplicateMapping { browser_id, operating_system_id } => write!(
                f,
                "浏览器 #{} 存在重复的操作系统关联（#{}），已忽略",
                browser_id, operating_system_id
            ),
            Diagnostic::OrphanPattern { kind, id, position } => {
                write!(f, "{} 正则（位置 {}）引用的实体 #{} 不存在", kind, position, id)
            }
            Diagnostic::InvalidPattern { kind, id, position, reason } => write!(
                f,
                "{} #{} 的正则（位置 {}）无效：{}",
                kind, id, position, reason
            ),
            Diagnostic::InvalidRecord { kind, id, reason } => {
                write!(f, "{} #{} 无效：{}", kind, id, reason)
            }
        }
    }
}

/// 待装配的浏览器记录
#[derive(Debug, Clone)]
pub struct BrowserEntry {
    pub id: u32,
    pub type_id: u32,
    pub family: String,
    pub name: String,
    pub vendor: Vendor,
}

/// 待装配的操作系统记录
#[derive(Debug, Clone)]
pub struct OperatingSystemEntry {
    pub id: u32,
    pub family_name: String,
    pub name: String,
    pub vendor: Vendor,
}

/// 待装配的设备记录
#[derive(Debug, Clone)]
pub struct DeviceEntry {
    pub id: u32,
    pub name: String,
    pub icon: String,
    pub info_url: String,
}

/// 规则库装配器
#[derive(Debug, Default)]
pub struct DataBuilder {
    version: Option<String>,
    browser_types: HashMap<u32, BrowserType>,
    browsers: BTreeMap<u32, BrowserEntry>,
    operating_systems: BTreeMap<u32, OperatingSystemEntry>,
    robots: BTreeMap<u32, Robot>,
    devices: BTreeMap<u32, DeviceEntry>,
    browser_patterns: BTreeSet<OrderedPattern>,
    operating_system_patterns: BTreeSet<OrderedPattern>,
    device_patterns: BTreeSet<OrderedPattern>,
    mappings: Vec<BrowserOperatingSystemMapping>,
    diagnostics: Vec<Diagnostic>,
}

fn insert_unique<T>(map: &mut BTreeMap<u32, T>, id: u32, value: T, kind: &'static str) -> RsuResult<()> {
    match map.entry(id) {
        Entry::Occupied(_) => Err(RsuadetectorError::DuplicateId { kind, id }),
        Entry::Vacant(slot) => {
            slot.insert(value);
            Ok(())
        }
    }
}

fn insert_pattern(set: &mut BTreeSet<OrderedPattern>, pattern: OrderedPattern, kind: &'static str) -> RsuResult<()> {
    let id = pattern.id();
    if set.insert(pattern) {
        Ok(())
    } else {
        Err(RsuadetectorError::DuplicateId { kind, id })
    }
}

impl DataBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置版本号（必填）
    pub fn set_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.version = Some(version.into());
        self
    }

    pub fn append_browser_type(&mut self, browser_type: BrowserType) -> RsuResult<&mut Self> {
        let id = browser_type.id;
        if self.browser_types.contains_key(&id) {
            return Err(RsuadetectorError::DuplicateId { kind: "browser_type", id });
        }
        self.browser_types.insert(id, browser_type);
        Ok(self)
    }

    pub fn append_browser(&mut self, browser: BrowserEntry) -> RsuResult<&mut Self> {
        insert_unique(&mut self.browsers, browser.id, browser, "browser")?;
        Ok(self)
    }

    pub fn append_browser_pattern(&mut self, pattern: OrderedPattern) -> RsuResult<&mut Self> {
        insert_pattern(&mut self.browser_patterns, pattern, "browser_pattern")?;
        Ok(self)
    }

    pub fn append_operating_system(&mut self, operating_system: OperatingSystemEntry) -> RsuResult<&mut Self> {
        insert_unique(&mut self.operating_systems, operating_system.id, operating_system, "operating_system")?;
        Ok(self)
    }

    pub fn append_operating_system_pattern(&mut self, pattern: OrderedPattern) -> RsuResult<&mut Self> {
        insert_pattern(&mut self.operating_system_patterns, pattern, "operating_system_pattern")?;
        Ok(self)
    }

    pub fn append_browser_os_mapping(&mut self, mapping: BrowserOperatingSystemMapping) -> &mut Self {
        self.mappings.push(mapping);
        self
    }

    pub fn append_robot(&mut self, robot: Robot) -> RsuResult<&mut Self> {
        insert_unique(&mut self.robots, robot.id, robot, "robot")?;
        Ok(self)
    }

    pub fn append_device(&mut self, device: DeviceEntry) -> RsuResult<&mut Self> {
        insert_unique(&mut self.devices, device.id, device, "device")?;
        Ok(self)
    }

    pub fn append_device_pattern(&mut self, pattern: OrderedPattern) -> RsuResult<&mut Self> {
        insert_pattern(&mut self.device_patterns, pattern, "device_pattern")?;
        Ok(self)
    }

    /// 记录读取阶段产生的诊断（如无法编译的正则）
    pub fn add_diagnostic(&mut self, diagnostic: Diagnostic) -> &mut Self {
        self.diagnostics.push(diagnostic);
        self
    }

    pub fn build(self) -> RsuResult<Data> {
        self.build_with_diagnostics().map(|(data, _)| data)
    }

    /// 装配快照，同时返回所有被跳过记录的诊断信息
    pub fn build_with_diagnostics(self) -> RsuResult<(Data, Vec<Diagnostic>)> {
        let DataBuilder {
            version,
            browser_types,
            browsers,
            operating_systems,
            robots,
            devices,
            browser_patterns,
            operating_system_patterns,
            device_patterns,
            mappings,
            mut diagnostics,
        } = self;

        let version = version
            .filter(|v| !v.trim().is_empty())
            .ok_or(RsuadetectorError::MissingVersion)?;

        // 1. 操作系统（正则集合按ID归组）
        let mut os_pattern_sets = group_patterns(operating_system_patterns);
        let mut os_map: BTreeMap<u32, Arc<OperatingSystem>> = BTreeMap::new();
        for (id, entry) in operating_systems {
            let family = OperatingSystemFamily::evaluate_by_family_name(&entry.family_name);
            os_map.insert(
                id,
                Arc::new(OperatingSystem {
                    id,
                    family,
                    family_name: entry.family_name,
                    name: entry.name,
                    vendor: entry.vendor,
                    patterns: os_pattern_sets.remove(&id).unwrap_or_default(),
                }),
            );
        }
        report_orphans(&mut diagnostics, PatternKind::OperatingSystem, os_pattern_sets);

        // 2. 浏览器 -> 操作系统关联（每个浏览器只保留第一条有效关联）
        let mut browser_os: HashMap<u32, Arc<OperatingSystem>> = HashMap::new();
        for mapping in mappings {
            let BrowserOperatingSystemMapping { browser_id, operating_system_id } = mapping;
            match (browsers.contains_key(&browser_id), os_map.get(&operating_system_id)) {
                (true, Some(os)) => {
                    if browser_os.contains_key(&browser_id) {
                        diagnostics.push(Diagnostic::DuplicateMapping { browser_id, operating_system_id });
                    } else {
                        browser_os.insert(browser_id, os.clone());
                    }
                }
                _ => diagnostics.push(Diagnostic::UnresolvedMapping { browser_id, operating_system_id }),
            }
        }

        // 3. 浏览器（类型缺失则跳过）
        let mut browser_pattern_sets = group_patterns(browser_patterns);
        let mut browser_map: BTreeMap<u32, Arc<Browser>> = BTreeMap::new();
        for (id, entry) in browsers {
            let Some(browser_type) = browser_types.get(&entry.type_id) else {
                diagnostics.push(Diagnostic::MissingBrowserType { browser_id: id, type_id: entry.type_id });
                browser_pattern_sets.remove(&id);
                continue;
            };
            browser_map.insert(
                id,
                Arc::new(Browser {
                    id,
                    family: entry.family,
                    name: entry.name,
                    vendor: entry.vendor,
                    browser_type: browser_type.clone(),
                    operating_system: browser_os.remove(&id),
                    patterns: browser_pattern_sets.remove(&id).unwrap_or_default(),
                }),
            );
        }
        report_orphans(&mut diagnostics, PatternKind::Browser, browser_pattern_sets);

        // 4. 设备
        let mut device_pattern_sets = group_patterns(device_patterns);
        let mut device_map: BTreeMap<u32, Arc<Device>> = BTreeMap::new();
        for (id, entry) in devices {
            device_map.insert(
                id,
                Arc::new(Device {
                    id,
                    category: DeviceCategory::evaluate(&entry.name),
                    name: entry.name,
                    icon: entry.icon,
                    info_url: entry.info_url,
                    patterns: device_pattern_sets.remove(&id).unwrap_or_default(),
                }),
            );
        }
        report_orphans(&mut diagnostics, PatternKind::Device, device_pattern_sets);

        // 5. 合并为全局有序映射
        let browser_index = merge_patterns(browser_map.values(), |b| &b.patterns);
        let os_index = merge_patterns(os_map.values(), |os| &os.patterns);
        let device_index = merge_patterns(device_map.values(), |d| &d.patterns);

        let robots: Vec<Arc<Robot>> = robots.into_values().map(Arc::new).collect();

        let data = Data::new(
            version,
            browser_map,
            os_map,
            robots,
            device_map,
            browser_index,
            os_index,
            device_index,
        );
        debug!("规则库装配完成：{}，跳过记录 {} 条", data.stats(), diagnostics.len());
        Ok((data, diagnostics))
    }
}

fn group_patterns(patterns: BTreeSet<OrderedPattern>) -> HashMap<u32, BTreeSet<OrderedPattern>> {
    let mut grouped: HashMap<u32, BTreeSet<OrderedPattern>> = HashMap::new();
    for pattern in patterns {
        grouped.entry(pattern.id()).or_default().insert(pattern);
    }
    grouped
}

fn report_orphans(
    diagnostics: &mut Vec<Diagnostic>,
    kind: PatternKind,
    leftovers: HashMap<u32, BTreeSet<OrderedPattern>>,
) {
    let mut orphans: Vec<_> = leftovers
        .into_values()
        .flatten()
        .map(|p| Diagnostic::OrphanPattern { kind, id: p.id(), position: p.position() })
        .collect();
    orphans.sort_by_key(|d| match d {
        Diagnostic::OrphanPattern { id, position, .. } => (*position, *id),
        _ => (0, 0),
    });
    diagnostics.extend(orphans);
}

fn merge_patterns<'a, T: 'a>(
    entities: impl Iterator<Item = &'a Arc<T>>,
    patterns_of: impl Fn(&T) -> &BTreeSet<OrderedPattern>,
) -> BTreeMap<OrderedPattern, Arc<T>> {
    let mut merged = BTreeMap::new();
    for entity in entities {
        for pattern in patterns_of(entity) {
            merged.insert(pattern.clone(), entity.clone());
        }
    }
    merged
}
