//! 不可变规则库快照
//! 一个 `Data` 由装配器构建一次，之后只读；更新时整体替换，不做原地修改

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use crate::model::{Browser, Device, OperatingSystem, OrderedPattern, Robot};

static EMPTY_DATA: Lazy<Arc<Data>> = Lazy::new(|| Arc::new(Data::default()));

/// 规则库快照
#[derive(Debug, Default)]
pub struct Data {
    version: String,
    browsers: BTreeMap<u32, Arc<Browser>>,
    operating_systems: BTreeMap<u32, Arc<OperatingSystem>>,
    robots: Vec<Arc<Robot>>,
    robot_index: HashMap<String, Arc<Robot>>,
    devices: BTreeMap<u32, Arc<Device>>,
    browser_patterns: BTreeMap<OrderedPattern, Arc<Browser>>,
    operating_system_patterns: BTreeMap<OrderedPattern, Arc<OperatingSystem>>,
    device_patterns: BTreeMap<OrderedPattern, Arc<Device>>,
}

impl Data {
    /// 空数据占位（EMPTY），任何存储都不接受它作为有效数据
    pub fn empty() -> Arc<Data> {
        EMPTY_DATA.clone()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        version: String,
        browsers: BTreeMap<u32, Arc<Browser>>,
        operating_systems: BTreeMap<u32, Arc<OperatingSystem>>,
        robots: Vec<Arc<Robot>>,
        devices: BTreeMap<u32, Arc<Device>>,
        browser_patterns: BTreeMap<OrderedPattern, Arc<Browser>>,
        operating_system_patterns: BTreeMap<OrderedPattern, Arc<OperatingSystem>>,
        device_patterns: BTreeMap<OrderedPattern, Arc<Device>>,
    ) -> Self {
        // 相同 UA 字符串的爬虫只保留 ID 最小的一条
        let mut robot_index = HashMap::with_capacity(robots.len());
        for robot in &robots {
            robot_index
                .entry(robot.user_agent_string.clone())
                .or_insert_with(|| robot.clone());
        }
        Self {
            version,
            browsers,
            operating_systems,
            robots,
            robot_index,
            devices,
            browser_patterns,
            operating_system_patterns,
            device_patterns,
        }
    }

    /// 是否为空数据（版本号为空且所有集合为空）
    pub fn is_empty(&self) -> bool {
        self.version.is_empty()
            && self.browsers.is_empty()
            && self.operating_systems.is_empty()
            && self.robots.is_empty()
            && self.devices.is_empty()
            && self.browser_patterns.is_empty()
            && self.operating_system_patterns.is_empty()
            && self.device_patterns.is_empty()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn browsers(&self) -> impl Iterator<Item = &Arc<Browser>> {
        self.browsers.values()
    }

    pub fn browser(&self, id: u32) -> Option<&Arc<Browser>> {
        self.browsers.get(&id)
    }

    pub fn operating_systems(&self) -> impl Iterator<Item = &Arc<OperatingSystem>> {
        self.operating_systems.values()
    }

    pub fn operating_system(&self, id: u32) -> Option<&Arc<OperatingSystem>> {
        self.operating_systems.get(&id)
    }

    pub fn robots(&self) -> &[Arc<Robot>] {
        &self.robots
    }

    /// 按完整 UA 字符串查找爬虫
    pub fn robot_by_user_agent(&self, user_agent: &str) -> Option<&Arc<Robot>> {
        self.robot_index.get(user_agent)
    }

    pub fn devices(&self) -> impl Iterator<Item = &Arc<Device>> {
        self.devices.values()
    }

    pub fn has_devices(&self) -> bool {
        !self.devices.is_empty()
    }

    /// 浏览器正则（按匹配顺序）
    pub fn browser_patterns(&self) -> &BTreeMap<OrderedPattern, Arc<Browser>> {
        &self.browser_patterns
    }

    pub fn operating_system_patterns(&self) -> &BTreeMap<OrderedPattern, Arc<OperatingSystem>> {
        &self.operating_system_patterns
    }

    pub fn device_patterns(&self) -> &BTreeMap<OrderedPattern, Arc<Device>> {
        &self.device_patterns
    }

    /// 统计信息
    pub fn stats(&self) -> DataStats {
        let mut browsers_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for browser in self.browsers.values() {
            *browsers_by_type.entry(browser.browser_type.name.clone()).or_default() += 1;
        }
        DataStats {
            version: self.version.clone(),
            browsers: self.browsers.len(),
            browsers_by_type,
            browser_patterns: self.browser_patterns.len(),
            operating_systems: self.operating_systems.len(),
            operating_system_patterns: self.operating_system_patterns.len(),
            robots: self.robots.len(),
            devices: self.devices.len(),
            device_patterns: self.device_patterns.len(),
        }
    }
}

/// 规则库统计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataStats {
    pub version: String,
    pub browsers: usize,
    pub browsers_by_type: BTreeMap<String, usize>,
    pub browser_patterns: usize,
    pub operating_systems: usize,
    pub operating_system_patterns: usize,
    pub robots: usize,
    pub devices: usize,
    pub device_patterns: usize,
}

impl fmt::Display for DataStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "版本 {}：浏览器 {}（正则 {}），操作系统 {}（正则 {}），爬虫 {}，设备 {}（正则 {}）",
            self.version,
            self.browsers,
            self.browser_patterns,
            self.operating_systems,
            self.operating_system_patterns,
            self.robots,
            self.devices,
            self.device_patterns
        )?;
        for (type_name, count) in &self.browsers_by_type {
            write!(f, "；{} {}", type_name, count)?;
        }
        Ok(())
    }
}
