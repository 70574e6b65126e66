//! rsuadetector - 基于版本化正则规则库的 User-Agent 识别库
//! 规则库快照不可变，后台更新以原子替换的方式生效，并可持久化到本地缓存文件

// 导出全局错误类型
pub use self::error::{RsuResult, RsuadetectorError};

// 导出配置模块
pub use self::config::{ConfigManager, CustomConfigBuilder, RetryPolicy, StoreConfig};

// 导出领域模型
pub use self::model::{
    Browser, BrowserOperatingSystemMapping, BrowserType, Device, DeviceCategory, OperatingSystem,
    OperatingSystemFamily, OrderedPattern, PatternFlags, Robot, UserAgentType, Vendor, VersionNumber,
};

// 导出规则库快照与装配
pub use self::data::{Data, DataBuilder, DataReader, DataStats, Diagnostic, JsonDataReader};

// 导出数据存储
pub use self::store::{
    CacheFile, DataSource, DataStore, PersistStatus, RefreshOutcome, RefreshableStore, SimpleDataStore,
    SourceLocations, UpdateScheduler, UrlDataSource,
};

// 导出识别接口
pub use self::detector::{
    Classifier, DeviceInfo, OperatingSystemInfo, UpdatingUserAgentStringParser, UserAgent, UserAgentStringParser,
    classify, get_global_parser, init_global_parser, init_global_parser_with_config, parse_user_agent,
};

// 声明所有子模块
pub mod config;
pub mod data;
pub mod detector;
pub mod error;
pub mod model;
pub mod store;
