//! UA 解析器门面
//! 解析器只持有数据存储；每次解析读取一次快照，整个识别过程都基于同一份快照。

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::classifier::Classifier;
use super::result::UserAgent;
use crate::config::StoreConfig;
use crate::error::RsuResult;
use crate::store::{DataStore, RefreshOutcome, RefreshableStore, UpdateScheduler};

/// 基于任意数据存储的解析器
#[derive(Debug, Clone)]
pub struct UserAgentStringParser<S: DataStore + ?Sized> {
    store: Arc<S>,
}

impl<S: DataStore + ?Sized> UserAgentStringParser<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// 解析 UA 字符串
    pub fn parse(&self, user_agent: &str) -> UserAgent {
        let data = self.store.data();
        Classifier::default().classify(user_agent, &data)
    }

    /// 当前规则库版本
    pub fn data_version(&self) -> String {
        self.store.data().version().to_string()
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }
}

/// 后台自动更新的解析器
#[derive(Debug)]
pub struct UpdatingUserAgentStringParser {
    parser: UserAgentStringParser<RefreshableStore>,
    scheduler: UpdateScheduler,
}

impl UpdatingUserAgentStringParser {
    /// 按配置创建存储并启动后台更新
    pub async fn open(config: &StoreConfig, fallback: Option<Arc<dyn DataStore>>) -> RsuResult<Self> {
        let store = RefreshableStore::open(config, fallback).await?;
        Self::from_store(Arc::new(store), config.refresh_interval)
    }

    /// 使用已创建的存储；需在 tokio 运行时内调用
    pub fn from_store(store: Arc<RefreshableStore>, interval: Duration) -> RsuResult<Self> {
        let scheduler = UpdateScheduler::start(store.clone(), interval)?;
        debug!("自动更新解析器已启动，更新间隔：{:?}", interval);
        Ok(Self {
            parser: UserAgentStringParser::new(store),
            scheduler,
        })
    }

    pub fn parse(&self, user_agent: &str) -> UserAgent {
        self.parser.parse(user_agent)
    }

    pub fn data_version(&self) -> String {
        self.parser.data_version()
    }

    pub fn store(&self) -> &Arc<RefreshableStore> {
        self.parser.store()
    }

    pub fn update_interval(&self) -> Duration {
        self.scheduler.interval()
    }

    /// 调整更新间隔，会立即触发一轮更新
    pub fn set_update_interval(&self, interval: Duration) -> RsuResult<()> {
        self.scheduler.set_interval(interval)
    }

    /// 手动执行一轮更新（与后台更新串行）
    pub async fn refresh_now(&self) -> RefreshOutcome {
        self.parser.store().refresh().await
    }

    /// 停止后台更新，已加载的数据仍可使用
    pub fn stop_updates(&self) {
        self.scheduler.stop();
    }
}
