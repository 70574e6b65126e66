//! 版本号值类型与解析
//! 版本号按数字分组逐段比较，可与规范的点分字符串互相转换

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

// 点分数字 + 可选后缀（如 "3.6b1"、"1.0 beta"）
static VERSION_NUMBER_WITH_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)*)((?:\s|-|\.|\[|\]|\w+)+)?").expect("版本号正则无效")
});

static VERSION_STRING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+(?:\.\d+)*)((?:\s|-|\.|\[|\]|\w+)+)?").expect("版本号正则无效")
});

/// 版本号
///
/// `groups` 为数字分组（major.minor.bugfix...），`extension` 为紧跟其后的后缀。
/// 未知版本为空分组、空后缀。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct VersionNumber {
    groups: Vec<String>,
    extension: String,
}

impl VersionNumber {
    pub const UNKNOWN: VersionNumber = VersionNumber {
        groups: Vec::new(),
        extension: String::new(),
    };

    pub fn new<I, S>(groups: I, extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            groups: groups.into_iter().map(Into::into).collect(),
            extension: extension.into(),
        }
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn major(&self) -> Option<u64> {
        self.group(0)
    }

    pub fn minor(&self) -> Option<u64> {
        self.group(1)
    }

    pub fn bugfix(&self) -> Option<u64> {
        self.group(2)
    }

    fn group(&self, index: usize) -> Option<u64> {
        self.groups.get(index).and_then(|g| g.parse().ok())
    }

    pub fn is_unknown(&self) -> bool {
        self.groups.is_empty() && self.extension.is_empty()
    }

    /// 规范字符串：分组以 `.` 连接，后缀原样拼接
    pub fn to_version_string(&self) -> String {
        let mut out = self.groups.join(".");
        out.push_str(&self.extension);
        out
    }
}

/// 解析以版本号开头的字符串；不以数字开头时整串作为后缀
pub fn parse_version(version: &str) -> VersionNumber {
    match VERSION_STRING.captures(version) {
        Some(caps) => {
            let groups = caps[1].split('.').map(str::to_string).collect::<Vec<_>>();
            let extension = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or("");
            VersionNumber::new(groups, extension)
        }
        None => VersionNumber::new(Vec::<String>::new(), version),
    }
}

/// 取文本中最后一个版本号（用于爬虫名称，如 "Googlebot/2.1"）
pub fn parse_last_version_number(text: &str) -> VersionNumber {
    VERSION_NUMBER_WITH_SUFFIX
        .captures_iter(text)
        .last()
        .map(|caps| {
            let extension = caps.get(2).map(|m| m.as_str().trim_end()).unwrap_or("");
            VersionNumber::new(caps[1].split('.'), extension)
        })
        .unwrap_or(VersionNumber::UNKNOWN)
}

/// 取文本中第一个点分数字（不含后缀）
pub fn parse_first_version_number(text: &str) -> VersionNumber {
    VERSION_NUMBER_WITH_SUFFIX
        .captures(text)
        .map(|caps| VersionNumber::new(caps[1].split('.'), ""))
        .unwrap_or(VersionNumber::UNKNOWN)
}

// 数字分组逐段比较，缺失分组视为 0
fn compare_group(a: Option<&String>, b: Option<&String>) -> Ordering {
    fn digits(group: Option<&String>) -> &str {
        group.map(|s| s.trim_start_matches('0')).unwrap_or("")
    }
    let (a, b) = (digits(a), digits(b));
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

// 无数字分组的版本排在所有带分组的版本之前；分组相同再比较后缀
impl Ord for VersionNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.groups.is_empty(), other.groups.is_empty()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }
        let len = self.groups.len().max(other.groups.len());
        (0..len)
            .map(|i| compare_group(self.groups.get(i), other.groups.get(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.extension.cmp(&other.extension))
    }
}

impl PartialOrd for VersionNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionNumber {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionNumber {}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_version_string())
    }
}

impl FromStr for VersionNumber {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(parse_version(s))
    }
}

impl From<String> for VersionNumber {
    fn from(value: String) -> Self {
        parse_version(&value)
    }
}

impl From<VersionNumber> for String {
    fn from(value: VersionNumber) -> Self {
        value.to_version_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_version_with_extension() {
        let v = parse_version("3.6b1");
        assert_eq!(v.groups(), ["3", "6"]);
        assert_eq!(v.extension(), "b1");
        assert_eq!(v.major(), Some(3));
        assert_eq!(v.minor(), Some(6));
        assert_eq!(v.bugfix(), None);
    }

    #[test]
    fn test_parse_version_round_trip() {
        for text in ["13.0.782.112", "1.2.3-beta", "10.7.0", "2", "", "abc"] {
            let v: VersionNumber = text.parse().unwrap();
            assert_eq!(v.to_string(), text);
        }
    }

    #[test]
    fn test_parse_last_version_number() {
        assert_eq!(parse_last_version_number("Googlebot/2.1").to_string(), "2.1");
        assert_eq!(parse_last_version_number("Yahoo! Slurp 1.0 / 3.0").to_string(), "3.0");
        assert!(parse_last_version_number("Googlebot").is_unknown());
    }

    #[test]
    fn test_parse_first_version_number() {
        assert_eq!(parse_first_version_number("Windows NT 6.1; WOW64").to_string(), "6.1");
        assert!(parse_first_version_number("no digits").is_unknown());
    }

    #[test]
    fn test_component_wise_ordering() {
        let v = |s: &str| parse_version(s);
        assert!(v("1.10") > v("1.9"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.0.1") > v("1.0"));
        assert!(v("1.0") == v("1.0.0"));
        assert!(v("1.0b2") > v("1.0b1"));
        assert!(VersionNumber::UNKNOWN < v("0.1"));
    }

    #[test]
    fn test_zero_is_not_unknown() {
        let zero = parse_version("0");
        assert!(!zero.is_unknown());
        assert_ne!(zero, VersionNumber::UNKNOWN);
        assert!(VersionNumber::UNKNOWN < zero);
        assert_eq!(zero, parse_version("0.0"));
        assert_eq!(zero.major(), Some(0));

        // 无分组时只比较后缀
        assert!(!parse_version("beta").is_unknown());
        assert_ne!(parse_version("beta"), VersionNumber::UNKNOWN);
        assert_eq!(parse_version(""), VersionNumber::UNKNOWN);
        assert!(parse_version("").is_unknown());
    }

    #[test]
    fn test_serde_as_string() {
        let v = parse_version("13.0.782.112");
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"13.0.782.112\"");
        let back: VersionNumber = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v);
    }
}
