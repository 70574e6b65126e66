//! 版本更新协议
//! 远程版本号需先通过格式校验，再按字符串字典序与当前版本比较

use std::fmt;

/// 版本号的最大长度，超出视为异常响应（如 HTML 错误页）
pub const MAX_VERSION_LEN: usize = 64;

/// 版本号格式校验：非空、长度有限、仅包含字母数字与 `-` `_` `.`
pub fn is_well_formed_version(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_VERSION_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

/// 远程版本是否比当前版本新
///
/// 日期编码、零填充的版本号（如 `20240301-01`）在字典序下即可正确排序。
pub fn is_newer(remote: &str, current: &str) -> bool {
    is_well_formed_version(remote) && remote > current
}

/// 缓存写入结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistStatus {
    /// 未配置缓存文件
    Disabled,
    Written,
    /// 写入失败，下一轮重试
    Failed,
}

/// 一轮更新的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 远程版本不比当前新
    UpToDate { version: String },
    /// 已切换到新数据
    Updated {
        previous: String,
        current: String,
        persistence: PersistStatus,
    },
    /// 数据未更新，仅补写了缓存文件
    CachePopulated { version: String, persistence: PersistStatus },
    /// 本轮放弃，保留当前数据
    Aborted { reason: String },
}

impl RefreshOutcome {
    pub fn is_updated(&self) -> bool {
        matches!(self, RefreshOutcome::Updated { .. })
    }
}

impl fmt::Display for RefreshOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshOutcome::UpToDate { version } => write!(f, "已是最新版本 {}", version),
            RefreshOutcome::Updated { previous, current, persistence } => {
                write!(f, "已从 {} 更新到 {}（缓存：{:?}）", previous, current, persistence)
            }
            RefreshOutcome::CachePopulated { version, persistence } => {
                write!(f, "已补写缓存，版本 {}（缓存：{:?}）", version, persistence)
            }
            RefreshOutcome::Aborted { reason } => write!(f, "本轮更新放弃：{}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_tokens() {
        assert!(is_well_formed_version("20240301-01"));
        assert!(is_well_formed_version("1.2_3"));
        assert!(!is_well_formed_version(""));
        assert!(!is_well_formed_version("2024 0301"));
        assert!(!is_well_formed_version("20240301-01\n"));
        assert!(!is_well_formed_version("<html>"));
        assert!(!is_well_formed_version(&"9".repeat(MAX_VERSION_LEN + 1)));
    }

    #[test]
    fn test_is_newer_matches_lexicographic_order() {
        let tokens = ["20120101-01", "20120101-02", "20121231-01", "20130101-01", "a", "Z"];
        for a in tokens {
            for b in tokens {
                assert_eq!(is_newer(a, b), a > b, "{} vs {}", a, b);
            }
        }
    }

    #[test]
    fn test_is_newer_rejects_malformed_even_if_greater() {
        assert!(!is_newer("", "20120101-01"));
        assert!(!is_newer("zz zz", "20120101-01"));
        assert!(!is_newer("<!DOCTYPE html>", "20120101-01"));
        assert!(!is_newer("~~~", "20120101-01"));
        // 当前为空（初次）时，合法版本均视为更新
        assert!(is_newer("20120101-01", ""));
    }
}
