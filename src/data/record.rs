//! 原始规则记录（JSON 格式）
//! 字段名与上游数据文件保持一致，仅做反序列化，不做任何校验

use serde::{Deserialize, Serialize};

/// 规则库原始文档
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DataRecords {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub browser_types: Vec<BrowserTypeRecord>,
    #[serde(default)]
    pub browsers: Vec<BrowserRecord>,
    #[serde(default)]
    pub browser_patterns: Vec<PatternRecord>,
    #[serde(default)]
    pub operating_systems: Vec<OperatingSystemRecord>,
    #[serde(default)]
    pub operating_system_patterns: Vec<PatternRecord>,
    #[serde(default)]
    pub browser_os: Vec<BrowserOsRecord>,
    #[serde(default)]
    pub robots: Vec<RobotRecord>,
    #[serde(default)]
    pub devices: Vec<DeviceRecord>,
    #[serde(default)]
    pub device_patterns: Vec<PatternRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserTypeRecord {
    pub id: u32,
    #[serde(rename = "type", alias = "name")]
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserRecord {
    pub id: u32,
    #[serde(rename = "type")]
    pub type_id: u32,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub url_company: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub browser_info_url: String,
}

/// 正则记录，`id` 为所属实体ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternRecord {
    pub id: u32,
    pub order: u32,
    pub regstring: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatingSystemRecord {
    pub id: u32,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub url_company: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub os_info_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserOsRecord {
    pub browser_id: u32,
    pub os_id: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotRecord {
    pub id: u32,
    pub useragent: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub url_company: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub bot_info_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub device_info_url: String,
}
