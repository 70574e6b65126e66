//! 识别结果
//! 未识别的字段统一使用空值占位，不会出现缺失字段

use serde::Serialize;

use crate::model::{DeviceCategory, OperatingSystemFamily, UserAgentType, VersionNumber};

/// 操作系统识别结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperatingSystemInfo {
    pub family: OperatingSystemFamily,
    pub family_name: String,
    pub name: String,
    pub producer: String,
    pub producer_url: String,
    pub url: String,
    pub icon: String,
    pub version: VersionNumber,
}

impl OperatingSystemInfo {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// 设备识别结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub category: DeviceCategory,
    pub name: String,
    pub icon: String,
    pub info_url: String,
}

impl DeviceInfo {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// UA 识别结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserAgent {
    pub family: String,
    pub name: String,
    pub producer: String,
    pub producer_url: String,
    pub url: String,
    pub icon: String,
    pub info_url: String,
    #[serde(rename = "type")]
    pub kind: UserAgentType,
    pub type_name: String,
    pub version: VersionNumber,
    pub operating_system: OperatingSystemInfo,
    pub device: DeviceInfo,
}

impl UserAgent {
    /// 全空结果
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }

    pub fn is_robot(&self) -> bool {
        self.kind == UserAgentType::Robot
    }
}
