//! 有序正则模式
//! 规则库中的每条正则都带有分组ID与排序位置，全局按位置升序匹配

use std::cmp::Ordering;
use std::fmt;

use regex::{Captures, Regex, RegexBuilder};

use crate::error::{RsuResult, RsuadetectorError};

/// 正则修饰符（Perl 风格 /.../imsx）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PatternFlags(u8);

impl PatternFlags {
    pub const NONE: PatternFlags = PatternFlags(0);
    pub const CASE_INSENSITIVE: PatternFlags = PatternFlags(1);
    pub const MULTI_LINE: PatternFlags = PatternFlags(1 << 1);
    pub const DOT_MATCHES_NEW_LINE: PatternFlags = PatternFlags(1 << 2);
    pub const IGNORE_WHITESPACE: PatternFlags = PatternFlags(1 << 3);

    /// 解析修饰符字符串，仅支持 i / m / s / x
    pub fn from_modifiers(modifiers: &str) -> RsuResult<Self> {
        let mut flags = PatternFlags::NONE;
        for chr in modifiers.chars() {
            flags = flags
                | match chr {
                    'i' => PatternFlags::CASE_INSENSITIVE,
                    'm' => PatternFlags::MULTI_LINE,
                    's' => PatternFlags::DOT_MATCHES_NEW_LINE,
                    'x' => PatternFlags::IGNORE_WHITESPACE,
                    other => {
                        return Err(RsuadetectorError::InvalidInput(format!(
                            "不支持的正则修饰符：{}",
                            other
                        )));
                    }
                };
        }
        Ok(flags)
    }

    pub fn contains(self, other: PatternFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// 还原为修饰符字符串（固定顺序 imsx）
    pub fn to_modifiers(self) -> String {
        [
            (PatternFlags::CASE_INSENSITIVE, 'i'),
            (PatternFlags::MULTI_LINE, 'm'),
            (PatternFlags::DOT_MATCHES_NEW_LINE, 's'),
            (PatternFlags::IGNORE_WHITESPACE, 'x'),
        ]
        .iter()
        .filter(|(flag, _)| self.contains(*flag))
        .map(|(_, chr)| *chr)
        .collect()
    }
}

impl std::ops::BitOr for PatternFlags {
    type Output = PatternFlags;

    fn bitor(self, rhs: Self) -> Self::Output {
        PatternFlags(self.0 | rhs.0)
    }
}

/// 带排序键的已编译正则
///
/// 排序规则：`position` 升序，位置相同时依次比较正则源文本、修饰符、分组ID，
/// 保证两个不同的模式在有序容器中不会被视为相等。
/// 空值（`None`）排在任何模式之前，由 `Option<OrderedPattern>` 的排序天然保证。
#[derive(Clone)]
pub struct OrderedPattern {
    id: u32,
    position: u32,
    regex: Regex,
    flags: PatternFlags,
}

impl OrderedPattern {
    /// 编译正则并创建模式
    pub fn new(id: u32, position: u32, source: &str, flags: PatternFlags) -> RsuResult<Self> {
        let regex = RegexBuilder::new(source)
            .case_insensitive(flags.contains(PatternFlags::CASE_INSENSITIVE))
            .multi_line(flags.contains(PatternFlags::MULTI_LINE))
            .dot_matches_new_line(flags.contains(PatternFlags::DOT_MATCHES_NEW_LINE))
            .ignore_whitespace(flags.contains(PatternFlags::IGNORE_WHITESPACE))
            .build()?;
        Ok(Self {
            id,
            position,
            regex,
            flags,
        })
    }

    /// 从 Perl 风格正则（如 `/chrome\/([0-9.]+)/si`）创建模式
    pub fn from_perl(id: u32, position: u32, perl_regex: &str) -> RsuResult<Self> {
        let (source, flags) = split_perl_regex(perl_regex)?;
        Self::new(id, position, source, flags)
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn source(&self) -> &str {
        self.regex.as_str()
    }

    pub fn flags(&self) -> PatternFlags {
        self.flags
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// 在输入中查找（非整串匹配）
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn captures<'t>(&self, text: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(text)
    }
}

/// 拆分 Perl 风格正则为正则体与修饰符
pub fn split_perl_regex(perl_regex: &str) -> RsuResult<(&str, PatternFlags)> {
    let trimmed = perl_regex.trim();
    let invalid = || {
        RsuadetectorError::InvalidInput(format!(
            "正则不是 Perl 风格或包含不支持的修饰符：{}",
            trimmed
        ))
    };

    let body = trimmed.strip_prefix('/').ok_or_else(invalid)?;
    let last_slash = body.rfind('/').ok_or_else(invalid)?;
    let flags = PatternFlags::from_modifiers(&body[last_slash + 1..]).map_err(|_| invalid())?;
    Ok((&body[..last_slash], flags))
}

impl Ord for OrderedPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.position
            .cmp(&other.position)
            .then_with(|| self.source().cmp(other.source()))
            .then_with(|| self.flags.cmp(&other.flags))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for OrderedPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OrderedPattern {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OrderedPattern {}

impl fmt::Debug for OrderedPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedPattern")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("regex", &format_args!("/{}/{}", self.source(), self.flags.to_modifiers()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_orders_before_id() {
        let p1 = OrderedPattern::new(99, 1, "b", PatternFlags::NONE).unwrap();
        let p2 = OrderedPattern::new(1, 2, "a", PatternFlags::NONE).unwrap();
        assert!(p1 < p2);
        assert!(p2 > p1);
    }

    #[test]
    fn test_none_orders_first() {
        let p = OrderedPattern::new(1, 0, "a", PatternFlags::NONE).unwrap();
        assert!(None < Some(p));
    }

    #[test]
    fn test_same_position_never_equal() {
        // 同一位置、不同正则文本
        let p1 = OrderedPattern::new(1, 5, "abc", PatternFlags::NONE).unwrap();
        let p2 = OrderedPattern::new(1, 5, "abd", PatternFlags::NONE).unwrap();
        assert_ne!(p1, p2);
        assert!(p1 < p2);

        // 同一位置、同一正则、不同修饰符
        let p3 = OrderedPattern::new(1, 5, "abc", PatternFlags::CASE_INSENSITIVE).unwrap();
        assert_ne!(p1, p3);
        assert!(p1 < p3);

        // 仅ID不同
        let p4 = OrderedPattern::new(2, 5, "abc", PatternFlags::NONE).unwrap();
        assert_ne!(p1, p4);

        let set: std::collections::BTreeSet<_> = [p1, p2, p3, p4].into_iter().collect();
        assert_eq!(set.len(), 4);
    }

    #[test]
    fn test_from_perl_with_modifiers() {
        let pattern = OrderedPattern::from_perl(3, 7, r"/chrome\/([0-9.]+)/si").unwrap();
        assert_eq!(pattern.source(), r"chrome\/([0-9.]+)");
        assert!(pattern.flags().contains(PatternFlags::CASE_INSENSITIVE));
        assert!(pattern.flags().contains(PatternFlags::DOT_MATCHES_NEW_LINE));
        assert_eq!(pattern.flags().to_modifiers(), "is");

        let caps = pattern.captures("Mozilla/5.0 CHROME/13.0.782.112 Safari").unwrap();
        assert_eq!(caps.get(1).unwrap().as_str(), "13.0.782.112");
    }

    #[test]
    fn test_from_perl_rejects_invalid() {
        assert!(OrderedPattern::from_perl(1, 1, "chrome").is_err());
        assert!(OrderedPattern::from_perl(1, 1, "/chrome/q").is_err());
        assert!(OrderedPattern::from_perl(1, 1, "/chrome(/i").is_err());
    }

    #[test]
    fn test_from_perl_without_modifiers() {
        let pattern = OrderedPattern::from_perl(1, 1, "/Opera Mini/").unwrap();
        assert_eq!(pattern.flags(), PatternFlags::NONE);
        assert!(pattern.is_match("Opera/9.80 (J2ME/MIDP; Opera Mini/5.0)"));
        assert!(!pattern.is_match("opera mini"));
    }
}
