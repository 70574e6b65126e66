//! 分类实体：浏览器、操作系统、爬虫、设备
//! 实体由装配器构建一次，之后只读

use std::collections::BTreeSet;
use std::sync::Arc;

use super::family::{DeviceCategory, OperatingSystemFamily, UserAgentType};
use super::pattern::OrderedPattern;

/// 浏览器类型（类别标签）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserType {
    pub id: u32,
    pub name: String,
}

impl BrowserType {
    pub fn kind(&self) -> UserAgentType {
        UserAgentType::evaluate_by_type_name(&self.name)
    }
}

/// 生产商 / 链接等展示信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vendor {
    pub producer: String,
    pub producer_url: String,
    pub url: String,
    pub icon: String,
    pub info_url: String,
}

/// 浏览器
#[derive(Debug, Clone)]
pub struct Browser {
    pub id: u32,
    pub family: String,
    pub name: String,
    pub vendor: Vendor,
    pub browser_type: BrowserType,
    pub operating_system: Option<Arc<OperatingSystem>>,
    pub patterns: BTreeSet<OrderedPattern>,
}

impl Browser {
    /// 展示名称：名称为空时回退到家族名
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.family } else { &self.name }
    }
}

/// 操作系统
#[derive(Debug, Clone)]
pub struct OperatingSystem {
    pub id: u32,
    pub family: OperatingSystemFamily,
    pub family_name: String,
    pub name: String,
    pub vendor: Vendor,
    pub patterns: BTreeSet<OrderedPattern>,
}

/// 爬虫（仅按完整 UA 字符串相等匹配）
#[derive(Debug, Clone)]
pub struct Robot {
    pub id: u32,
    pub user_agent_string: String,
    pub family: String,
    pub name: String,
    pub vendor: Vendor,
}

/// 设备
#[derive(Debug, Clone)]
pub struct Device {
    pub id: u32,
    pub name: String,
    pub category: DeviceCategory,
    pub icon: String,
    pub info_url: String,
    pub patterns: BTreeSet<OrderedPattern>,
}

/// 浏览器与操作系统的关联
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BrowserOperatingSystemMapping {
    pub browser_id: u32,
    pub operating_system_id: u32,
}
