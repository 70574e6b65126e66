//! 规则库值类型：有序正则、实体、分类枚举、版本号

pub mod entity;
pub mod family;
pub mod pattern;
pub mod version;

pub use entity::{Browser, BrowserOperatingSystemMapping, BrowserType, Device, OperatingSystem, Robot, Vendor};
pub use family::{DeviceCategory, OperatingSystemFamily, UserAgentType};
pub use pattern::{OrderedPattern, PatternFlags};
pub use version::{VersionNumber, parse_first_version_number, parse_last_version_number, parse_version};
