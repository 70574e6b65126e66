//! 数据源
//! 负责从数据地址 / 版本号地址拉取原始字节，支持 http(s) 与 file 协议

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::{RetryPolicy, StoreConfig};
use crate::error::{RsuResult, RsuadetectorError};

/// 数据源地址
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocations {
    pub data_url: Url,
    pub version_url: Url,
    pub definition_url: Url,
}

/// 数据源能力：拉取数据字节与版本号
#[async_trait]
pub trait DataSource: Debug + Send + Sync {
    /// 拉取完整数据
    async fn fetch_data(&self) -> RsuResult<Vec<u8>>;

    /// 拉取远程版本号（响应体第一行）
    async fn fetch_version(&self) -> RsuResult<String>;

    fn locations(&self) -> &SourceLocations;

    fn charset(&self) -> &str;
}

/// 基于 URL 的数据源
#[derive(Debug, Clone)]
pub struct UrlDataSource {
    locations: SourceLocations,
    charset: String,
    client: Client,
    retry: RetryPolicy,
    user_agent: String,
}

impl UrlDataSource {
    /// 按配置创建（连接超时与总超时均来自配置）
    pub fn from_config(config: &StoreConfig) -> RsuResult<Self> {
        Self::with_locations(config.locations()?, config)
    }

    /// 使用默认超时创建
    pub fn new(locations: SourceLocations, charset: impl Into<String>) -> RsuResult<Self> {
        let config = StoreConfig {
            charset: charset.into(),
            ..StoreConfig::default()
        };
        Self::with_locations(locations, &config)
    }

    fn with_locations(locations: SourceLocations, config: &StoreConfig) -> RsuResult<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.http_timeout)
            .build()?;
        Ok(Self {
            locations,
            charset: config.charset.clone(),
            client,
            retry: config.retry,
            user_agent: config.user_agent.clone(),
        })
    }

    /// 通用异步重试逻辑，保留最后一次错误
    async fn fetch_with_retry(&self, url: &Url) -> RsuResult<Vec<u8>> {
        let max_retries = self.retry.max_retries();
        let mut last_err: Option<RsuadetectorError> = None;

        for attempt in 0..=max_retries {
            match self.fetch_once(url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    if attempt < max_retries {
                        warn!("拉取 {} 失败：{}，重试中（{}/{}）", url, e, attempt + 1, max_retries);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| RsuadetectorError::SourceError(format!("拉取 {} 失败：重试次数已用尽", url))))
    }

    async fn fetch_once(&self, url: &Url) -> RsuResult<Vec<u8>> {
        match url.scheme() {
            "http" | "https" => {
                let response = self
                    .client
                    .get(url.clone())
                    .header("User-Agent", self.user_agent.as_str())
                    .send()
                    .await?;

                if !response.status().is_success() {
                    return Err(RsuadetectorError::SourceError(format!(
                        "URL {} 返回状态码 {}",
                        url,
                        response.status()
                    )));
                }

                // 原样保留响应字节，缓存文件与远程内容逐字节一致
                let bytes = response.bytes().await?.to_vec();
                debug!("拉取 {} 成功，大小：{} 字节", url, bytes.len());
                Ok(bytes)
            }
            "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| RsuadetectorError::SourceError(format!("无效的文件地址：{}", url)))?;
                let bytes = tokio::fs::read(&path).await?;
                debug!("读取本地文件 {} 成功，大小：{} 字节", path.display(), bytes.len());
                Ok(bytes)
            }
            other => Err(RsuadetectorError::SourceError(format!("不支持的协议：{}（{}）", other, url))),
        }
    }
}

/// 取版本号响应的第一行
pub fn first_line(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .lines()
        .next()
        .unwrap_or("")
        .trim()
        .to_string()
}

#[async_trait]
impl DataSource for UrlDataSource {
    async fn fetch_data(&self) -> RsuResult<Vec<u8>> {
        self.fetch_with_retry(&self.locations.data_url).await
    }

    async fn fetch_version(&self) -> RsuResult<String> {
        let body = self.fetch_with_retry(&self.locations.version_url).await?;
        Ok(first_line(&body))
    }

    fn locations(&self) -> &SourceLocations {
        &self.locations
    }

    fn charset(&self) -> &str {
        &self.charset
    }
}
