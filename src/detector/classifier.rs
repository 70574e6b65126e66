//! 识别引擎：按级联顺序匹配 UA 字符串
//! 爬虫 -> 浏览器 -> 操作系统 -> 设备，每一级都是"第一个命中者生效"
//!
//! 引擎是输入 UA 与快照的纯函数，可在同一快照上并发调用。

use crate::data::Data;
use crate::model::{DeviceCategory, OperatingSystem, UserAgentType, parse_last_version_number, parse_version};

use super::os_version::OsVersionRules;
use super::result::{DeviceInfo, OperatingSystemInfo, UserAgent};

/// 识别引擎
#[derive(Debug, Clone, Copy)]
pub struct Classifier<'r> {
    os_rules: &'r OsVersionRules,
}

impl Default for Classifier<'static> {
    fn default() -> Self {
        Self::new(OsVersionRules::shared())
    }
}

impl<'r> Classifier<'r> {
    /// 使用自定义的操作系统版本规则表
    pub fn new(os_rules: &'r OsVersionRules) -> Self {
        Self { os_rules }
    }

    /// 识别 UA 字符串；未命中的字段保持空值，不会返回错误
    pub fn classify(&self, user_agent: &str, data: &Data) -> UserAgent {
        let mut result = UserAgent::empty();

        if examine_as_robot(&mut result, user_agent, data) {
            return result;
        }
        self.examine_as_browser(&mut result, user_agent, data);
        if result.operating_system.is_empty() {
            self.examine_operating_system(&mut result, user_agent, data);
        }
        examine_device(&mut result, user_agent, data);
        result
    }

    fn examine_as_browser(&self, result: &mut UserAgent, user_agent: &str, data: &Data) {
        for (pattern, browser) in data.browser_patterns() {
            let Some(caps) = pattern.captures(user_agent) else {
                continue;
            };
            result.family = browser.family.clone();
            result.name = browser.display_name().to_string();
            result.producer = browser.vendor.producer.clone();
            result.producer_url = browser.vendor.producer_url.clone();
            result.url = browser.vendor.url.clone();
            result.icon = browser.vendor.icon.clone();
            result.info_url = browser.vendor.info_url.clone();
            result.kind = browser.browser_type.kind();
            result.type_name = browser.browser_type.name.clone();
            // 版本号取第一个捕获组，无捕获组或为空时为未知版本
            result.version = caps
                .get(1)
                .map(|m| parse_version(m.as_str()))
                .unwrap_or_default();
            if let Some(os) = &browser.operating_system {
                let version = self
                    .os_rules
                    .rules_for(os.family)
                    .iter()
                    .find_map(|rule| rule.extract(user_agent))
                    .unwrap_or_default();
                result.operating_system = os_info(os, version);
            }
            break;
        }
    }

    fn examine_operating_system(&self, result: &mut UserAgent, user_agent: &str, data: &Data) {
        for (pattern, os) in data.operating_system_patterns() {
            if let Some(caps) = pattern.captures(user_agent) {
                let version = self.os_rules.extract(os.family, user_agent, &caps);
                result.operating_system = os_info(os, version);
                break;
            }
        }
    }
}

/// 使用内置版本规则识别
pub fn classify(user_agent: &str, data: &Data) -> UserAgent {
    Classifier::default().classify(user_agent, data)
}

fn examine_as_robot(result: &mut UserAgent, user_agent: &str, data: &Data) -> bool {
    let Some(robot) = data.robot_by_user_agent(user_agent) else {
        return false;
    };
    result.family = robot.family.clone();
    result.name = robot.name.clone();
    result.producer = robot.vendor.producer.clone();
    result.producer_url = robot.vendor.producer_url.clone();
    result.url = robot.vendor.url.clone();
    result.icon = robot.vendor.icon.clone();
    result.info_url = robot.vendor.info_url.clone();
    result.kind = UserAgentType::Robot;
    result.type_name = UserAgentType::Robot.name().to_string();
    result.version = parse_last_version_number(&robot.name);
    true
}

fn examine_device(result: &mut UserAgent, user_agent: &str, data: &Data) {
    if !data.has_devices() {
        return;
    }
    for (pattern, device) in data.device_patterns() {
        if pattern.is_match(user_agent) {
            result.device = DeviceInfo {
                category: device.category,
                name: device.name.clone(),
                icon: device.icon.clone(),
                info_url: device.info_url.clone(),
            };
            return;
        }
    }
    result.device.category = DeviceCategory::Unknown;
}

fn os_info(os: &OperatingSystem, version: crate::model::VersionNumber) -> OperatingSystemInfo {
    OperatingSystemInfo {
        family: os.family,
        family_name: os.family_name.clone(),
        name: os.name.clone(),
        producer: os.vendor.producer.clone(),
        producer_url: os.vendor.producer_url.clone(),
        url: os.vendor.url.clone(),
        icon: os.vendor.icon.clone(),
        version,
    }
}
