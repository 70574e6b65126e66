//! 操作系统版本提取规则表
//! 不同家族的版本号位置与分隔符不同（如 OS X / iOS 使用下划线），
//! 每个家族对应一组有序规则：正则 + 捕获组序号 + 规范化方式，先匹配者生效。
//! 没有专用规则的家族使用通用回退：OS 正则的第一个捕获组，否则取命中片段中的第一个点分数字。

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::error::RsuResult;
use crate::model::{OperatingSystemFamily, VersionNumber, parse_first_version_number, parse_version};

static DEFAULT_RULES: Lazy<OsVersionRules> = Lazy::new(OsVersionRules::standard);

/// 捕获值的规范化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Normalization {
    #[default]
    None,
    /// `10_7_0` -> `10.7.0`
    UnderscoreToDot,
}

impl Normalization {
    fn apply(self, raw: &str) -> String {
        match self {
            Normalization::None => raw.to_string(),
            Normalization::UnderscoreToDot => raw.replace('_', "."),
        }
    }
}

/// 单条版本提取规则
#[derive(Debug, Clone)]
pub struct VersionRule {
    regex: Regex,
    group: usize,
    normalization: Normalization,
}

impl VersionRule {
    pub fn new(pattern: &str, group: usize, normalization: Normalization) -> RsuResult<Self> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            group,
            normalization,
        })
    }

    /// 命中且捕获组非空时返回版本号
    pub fn extract(&self, user_agent: &str) -> Option<VersionNumber> {
        let caps = self.regex.captures(user_agent)?;
        let raw = caps.get(self.group).map(|m| m.as_str()).filter(|s| !s.is_empty())?;
        Some(parse_version(&self.normalization.apply(raw)))
    }
}

/// 家族 -> 版本规则 分派表
#[derive(Debug, Clone, Default)]
pub struct OsVersionRules {
    rules: HashMap<OperatingSystemFamily, Vec<VersionRule>>,
}

impl OsVersionRules {
    /// 空表（全部走通用回退）
    pub fn new() -> Self {
        Self::default()
    }

    /// 共享的内置规则表
    pub fn shared() -> &'static OsVersionRules {
        &DEFAULT_RULES
    }

    /// 追加一条规则，排在该家族已有规则之后
    pub fn insert(&mut self, family: OperatingSystemFamily, rule: VersionRule) -> &mut Self {
        self.rules.entry(family).or_default().push(rule);
        self
    }

    pub fn rules_for(&self, family: OperatingSystemFamily) -> &[VersionRule] {
        self.rules.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 提取版本号：先走家族规则，全部未命中再走通用回退
    pub fn extract(&self, family: OperatingSystemFamily, user_agent: &str, os_match: &Captures) -> VersionNumber {
        self.rules_for(family)
            .iter()
            .find_map(|rule| rule.extract(user_agent))
            .unwrap_or_else(|| generic_version(os_match))
    }

    /// 内置规则
    pub fn standard() -> Self {
        use Normalization::{None as Plain, UnderscoreToDot};
        use OperatingSystemFamily as F;

        const TABLE: &[(OperatingSystemFamily, &str, usize, Normalization)] = &[
            (F::Windows, r"(?i)Windows NT (\d+(?:\.\d+)*)", 1, Plain),
            (F::Windows, r"(?i)Windows Phone(?: OS)? (\d+(?:\.\d+)*)", 1, Plain),
            (F::Windows, r"(?i)Windows (\d+(?:\.\d+)*)", 1, Plain),
            (F::OsX, r"(?i)Mac OS X[ /](\d+(?:[._]\d+)*)", 1, UnderscoreToDot),
            (F::Ios, r"(?i)(?:iPhone|CPU) OS (\d+(?:[._]\d+)*)", 1, UnderscoreToDot),
            (F::Ios, r"(?i)iOS[ /](\d+(?:[._]\d+)*)", 1, UnderscoreToDot),
            (F::Android, r"(?i)Android[ /-]?(\d+(?:\.\d+)*)", 1, Plain),
            (F::BlackBerryOs, r"(?i)BlackBerry\w*/(\d+(?:\.\d+)*)", 1, Plain),
            (F::BlackBerryOs, r"(?i)BB10;.*Version/(\d+(?:\.\d+)*)", 1, Plain),
            (F::Symbian, r"(?i)SymbianOS/(\d+(?:\.\d+)*[a-z]?)", 1, Plain),
            (F::Symbian, r"(?i)Series ?60/(\d+(?:\.\d+)*)", 1, Plain),
            (F::WebOs, r"(?i)(?:web|hpw)OS/(\d+(?:\.\d+)*)", 1, Plain),
            (F::Bada, r"(?i)Bada/(\d+(?:\.\d+)*)", 1, Plain),
            (F::Tizen, r"(?i)Tizen[ /](\d+(?:\.\d+)*)", 1, Plain),
            (F::Bsd, r"(?i)(?:Free|Open|Net|DragonFly)BSD[ /]?(\d+(?:\.\d+)*(?:-[\w-]+)?)", 1, Plain),
            (F::Solaris, r"(?i)SunOS (\d+(?:\.\d+)*)", 1, Plain),
            (F::Jvm, r"(?i)Java/?(\d+(?:\.\d+)*(?:_\d+)?(?:-\w+)?)", 1, Plain),
        ];

        let mut rules = Self::new();
        for (family, pattern, group, normalization) in TABLE {
            // 内置正则均为常量，编译失败说明表本身有误
            if let Ok(rule) = VersionRule::new(pattern, *group, *normalization) {
                rules.insert(*family, rule);
            }
        }
        rules
    }
}

/// 通用回退：OS 正则第一个捕获组，否则命中片段中的第一个点分数字
pub fn generic_version(os_match: &Captures) -> VersionNumber {
    if let Some(group) = os_match.get(1).filter(|m| !m.as_str().is_empty()) {
        return parse_version(group.as_str());
    }
    os_match
        .get(0)
        .map(|m| parse_first_version_number(m.as_str()))
        .unwrap_or(VersionNumber::UNKNOWN)
}
