//! 数据存储配置管理,存储所有可配置项

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::{RsuResult, RsuadetectorError};
use crate::store::SourceLocations;

/// 默认数据地址（JSON 格式）
pub const DEFAULT_DATA_URL: &str = "http://user-agent-string.info/rpc/get_data.php?key=free&format=json";
/// 默认版本号地址
pub const DEFAULT_VERSION_URL: &str = "http://user-agent-string.info/rpc/get_data.php?key=free&format=ini&ver=y";
/// 默认数据格式定义地址
pub const DEFAULT_DEFINITION_URL: &str = "http://user-agent-string.info/rpc/uasxmldata.dtd";
/// 默认字符集
pub const DEFAULT_CHARSET: &str = "UTF-8";
/// 默认更新间隔（24小时）
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// 重试策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryPolicy {
    #[default]
    Never,     // 不重试
    Times(u8), // 固定次数重试（不含第一次）
}

impl RetryPolicy {
    /// 最大重试次数
    pub fn max_retries(&self) -> usize {
        match self {
            RetryPolicy::Never => 0,
            RetryPolicy::Times(n) => *n as usize,
        }
    }
}

/// 数据存储配置
#[derive(Debug, Clone)]
pub struct StoreConfig {
    // 数据地址
    pub data_url: String,
    // 版本号地址
    pub version_url: String,
    // 数据格式定义地址（仅记录，不参与读取）
    pub definition_url: String,
    // 数据字符集
    pub charset: String,
    // 后台更新间隔
    pub refresh_interval: Duration,
    // 本地缓存文件，None 表示不缓存
    pub cache_path: Option<PathBuf>,
    // HTTP 总超时
    pub http_timeout: Duration,
    // HTTP 连接超时
    pub connect_timeout: Duration,
    // 拉取失败时的重试策略
    pub retry: RetryPolicy,
    // 请求时携带的 User-Agent
    pub user_agent: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_url: DEFAULT_DATA_URL.to_string(),
            version_url: DEFAULT_VERSION_URL.to_string(),
            definition_url: DEFAULT_DEFINITION_URL.to_string(),
            charset: DEFAULT_CHARSET.to_string(),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            cache_path: None,
            http_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(3),
            retry: RetryPolicy::Never,
            user_agent: format!("Rsuadetector/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl StoreConfig {
    /// 解析数据源地址
    pub fn locations(&self) -> RsuResult<SourceLocations> {
        Ok(SourceLocations {
            data_url: Url::parse(&self.data_url)?,
            version_url: Url::parse(&self.version_url)?,
            definition_url: Url::parse(&self.definition_url)?,
        })
    }
}

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 获取默认配置
    pub fn get_default() -> StoreConfig {
        StoreConfig::default()
    }

    /// 自定义配置
    pub fn custom() -> CustomConfigBuilder {
        CustomConfigBuilder::new()
    }
}

/// 配置构建器（便于自定义配置）
#[derive(Debug, Clone, Default)]
pub struct CustomConfigBuilder {
    config: StoreConfig,
}

impl CustomConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data_url(mut self, url: impl Into<String>) -> Self {
        self.config.data_url = url.into();
        self
    }

    pub fn version_url(mut self, url: impl Into<String>) -> Self {
        self.config.version_url = url.into();
        self
    }

    pub fn definition_url(mut self, url: impl Into<String>) -> Self {
        self.config.definition_url = url.into();
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = charset.into();
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.config.refresh_interval = interval;
        self
    }

    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = Some(path.into());
        self
    }

    pub fn http_timeout(mut self, timeout: Duration) -> Self {
        self.config.http_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 校验并生成配置：地址必须可解析，更新间隔不能为 0
    pub fn build(self) -> RsuResult<StoreConfig> {
        self.config.locations()?;
        if self.config.refresh_interval.is_zero() {
            return Err(RsuadetectorError::InvalidInput("更新间隔不能为0".to_string()));
        }
        if self.config.charset.trim().is_empty() {
            return Err(RsuadetectorError::InvalidInput("字符集不能为空".to_string()));
        }
        Ok(self.config)
    }
}
