//! 分类枚举：操作系统家族、UA 类型、设备类别

use serde::{Deserialize, Serialize};

/// 操作系统家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OperatingSystemFamily {
    Aix,
    Aros,
    AmigaOs,
    Android,
    Bsd,
    Bada,
    BeOs,
    DangerOs,
    HpUx,
    Haiku,
    Irix,
    InfernoOs,
    Jvm,
    Linux,
    MacOs,
    Minix,
    OsX,
    MorphOs,
    Nintendo,
    Os2,
    PalmOs,
    Qnx,
    BlackBerryOs,
    Solaris,
    Syllable,
    Symbian,
    Tizen,
    Windows,
    XrossMediaBar,
    Ios,
    WebOs,
    #[default]
    Unknown,
}

impl OperatingSystemFamily {
    pub const ALL: [OperatingSystemFamily; 32] = [
        Self::Aix,
        Self::Aros,
        Self::AmigaOs,
        Self::Android,
        Self::Bsd,
        Self::Bada,
        Self::BeOs,
        Self::DangerOs,
        Self::HpUx,
        Self::Haiku,
        Self::Irix,
        Self::InfernoOs,
        Self::Jvm,
        Self::Linux,
        Self::MacOs,
        Self::Minix,
        Self::OsX,
        Self::MorphOs,
        Self::Nintendo,
        Self::Os2,
        Self::PalmOs,
        Self::Qnx,
        Self::BlackBerryOs,
        Self::Solaris,
        Self::Syllable,
        Self::Symbian,
        Self::Tizen,
        Self::Windows,
        Self::XrossMediaBar,
        Self::Ios,
        Self::WebOs,
        Self::Unknown,
    ];

    /// 规则库中使用的家族名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Aix => "AIX",
            Self::Aros => "AROS",
            Self::AmigaOs => "Amiga OS",
            Self::Android => "Android",
            Self::Bsd => "BSD",
            Self::Bada => "Bada",
            Self::BeOs => "BeOS",
            Self::DangerOs => "DangerOS",
            Self::HpUx => "HP-UX",
            Self::Haiku => "Haiku OS",
            Self::Irix => "IRIX",
            Self::InfernoOs => "Inferno OS",
            Self::Jvm => "JVM",
            Self::Linux => "Linux",
            Self::MacOs => "Mac OS",
            Self::Minix => "MINIX",
            Self::OsX => "Mac OS X",
            Self::MorphOs => "MorphOS",
            Self::Nintendo => "Nintendo",
            Self::Os2 => "OS/2",
            Self::PalmOs => "Palm OS",
            Self::Qnx => "QNX",
            Self::BlackBerryOs => "RIM OS",
            Self::Solaris => "Solaris",
            Self::Syllable => "Syllable",
            Self::Symbian => "Symbian OS",
            Self::Tizen => "Tizen",
            Self::Windows => "Windows",
            Self::XrossMediaBar => "XrossMediaBar (XMB)",
            Self::Ios => "iOS",
            Self::WebOs => "webOS",
            Self::Unknown => "",
        }
    }

    // 名称之外可接受的别名
    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Self::Ios => &["iPhone OS"],
            Self::OsX => &["OS X"],
            _ => &[],
        }
    }

    /// 按家族名称查找：先精确匹配名称，再匹配别名，找不到则为 Unknown
    pub fn evaluate_by_family_name(family: &str) -> Self {
        let family = family.trim();
        Self::ALL
            .iter()
            .find(|value| value.name() == family)
            .or_else(|| Self::ALL.iter().find(|value| value.aliases().contains(&family)))
            .copied()
            .unwrap_or(Self::Unknown)
    }
}

/// UA 类型（浏览器类型表中的名称）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum UserAgentType {
    Browser,
    EmailClient,
    FeedReader,
    Library,
    MediaPlayer,
    MobileBrowser,
    OfflineBrowser,
    Other,
    Robot,
    UserAgentAnonymizer,
    Validator,
    WapBrowser,
    #[default]
    Unknown,
}

impl UserAgentType {
    pub const ALL: [UserAgentType; 13] = [
        Self::Browser,
        Self::EmailClient,
        Self::FeedReader,
        Self::Library,
        Self::MediaPlayer,
        Self::MobileBrowser,
        Self::OfflineBrowser,
        Self::Other,
        Self::Robot,
        Self::UserAgentAnonymizer,
        Self::Validator,
        Self::WapBrowser,
        Self::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Browser => "Browser",
            Self::EmailClient => "Email client",
            Self::FeedReader => "Feed Reader",
            Self::Library => "Library",
            Self::MediaPlayer => "Multimedia Player",
            Self::MobileBrowser => "Mobile Browser",
            Self::OfflineBrowser => "Offline Browser",
            Self::Other => "Other",
            Self::Robot => "Robot",
            Self::UserAgentAnonymizer => "Useragent Anonymizer",
            Self::Validator => "Validator",
            Self::WapBrowser => "Wap Browser",
            Self::Unknown => "",
        }
    }

    pub fn evaluate_by_type_name(type_name: &str) -> Self {
        Self::ALL
            .iter()
            .find(|value| value.name() == type_name)
            .copied()
            .unwrap_or(Self::Unknown)
    }
}

/// 设备类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum DeviceCategory {
    GameConsole,
    Other,
    PersonalComputer,
    SmartTv,
    Smartphone,
    Tablet,
    #[default]
    Unknown,
}

impl DeviceCategory {
    pub const ALL: [DeviceCategory; 7] = [
        Self::GameConsole,
        Self::Other,
        Self::PersonalComputer,
        Self::SmartTv,
        Self::Smartphone,
        Self::Tablet,
        Self::Unknown,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GameConsole => "Game console",
            Self::Other => "Other",
            Self::PersonalComputer => "Personal computer",
            Self::SmartTv => "Smart TV",
            Self::Smartphone => "Smartphone",
            Self::Tablet => "Tablet",
            Self::Unknown => "",
        }
    }

    pub fn evaluate(type_name: &str) -> Self {
        Self::ALL
            .iter()
            .find(|value| value.name() == type_name)
            .copied()
            .unwrap_or(Self::Unknown)
    }
}
