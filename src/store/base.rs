//! 基础数据存储
//! 只读视图：当前快照、读取器、数据源地址与字符集

use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use super::source::{DataSource, SourceLocations};
use crate::data::{Data, DataReader};
use crate::error::{RsuResult, RsuadetectorError};

/// 数据存储
pub trait DataStore: Debug + Send + Sync {
    /// 当前快照（一次原子读取）
    fn data(&self) -> Arc<Data>;

    fn reader(&self) -> Arc<dyn DataReader>;

    fn locations(&self) -> &SourceLocations;

    fn charset(&self) -> &str;

    /// 快照对应的原始字节（用于补写缓存文件），未保留时为 None
    fn payload(&self) -> Option<Arc<[u8]>> {
        None
    }
}

/// 固定快照的数据存储，常用作回退存储
#[derive(Debug, Clone)]
pub struct SimpleDataStore {
    data: Arc<Data>,
    reader: Arc<dyn DataReader>,
    locations: SourceLocations,
    charset: String,
    payload: Option<Arc<[u8]>>,
}

impl SimpleDataStore {
    /// 以已有快照创建；拒绝空数据
    pub fn new(
        data: Arc<Data>,
        reader: Arc<dyn DataReader>,
        locations: SourceLocations,
        charset: impl Into<String>,
    ) -> RsuResult<Self> {
        if data.is_empty() {
            return Err(RsuadetectorError::EmptyData);
        }
        Ok(Self {
            data,
            reader,
            locations,
            charset: charset.into(),
            payload: None,
        })
    }

    fn with_payload(mut self, payload: Option<Arc<[u8]>>) -> Self {
        self.payload = payload;
        self
    }

    /// 解析字节创建
    pub fn from_bytes(
        bytes: &[u8],
        reader: Arc<dyn DataReader>,
        locations: SourceLocations,
        charset: impl Into<String>,
    ) -> RsuResult<Self> {
        let data = reader.read(bytes)?;
        Ok(Self::new(Arc::new(data), reader, locations, charset)?.with_payload(Some(Arc::from(bytes))))
    }

    /// 读取本地文件创建（如随程序分发的规则库）
    pub async fn from_file(
        path: impl AsRef<Path>,
        reader: Arc<dyn DataReader>,
        locations: SourceLocations,
        charset: impl Into<String>,
    ) -> RsuResult<Self> {
        let bytes = tokio::fs::read(path.as_ref()).await?;
        Self::from_bytes(&bytes, reader, locations, charset)
    }

    /// 在线存储：构造时读取一次数据源，失败则使用回退存储的快照
    pub async fn from_source(
        source: &dyn DataSource,
        reader: Arc<dyn DataReader>,
        fallback: Option<&dyn DataStore>,
    ) -> RsuResult<Self> {
        let locations = source.locations().clone();
        let charset = source.charset().to_string();

        let primary = match source.fetch_data().await {
            Ok(bytes) => reader.read(&bytes).map(|data| (data, bytes)),
            Err(e) => Err(e),
        };
        match primary {
            Ok((data, bytes)) if !data.is_empty() => {
                debug!("在线数据读取成功：{}", data.stats());
                Ok(Self::new(Arc::new(data), reader, locations, charset)?.with_payload(Some(Arc::from(bytes))))
            }
            Ok(_) => fallback_or(fallback, reader, locations, charset, RsuadetectorError::EmptyData),
            Err(e) => {
                warn!("在线数据读取失败：{}", e);
                fallback_or(fallback, reader, locations, charset, e)
            }
        }
    }
}

fn fallback_or(
    fallback: Option<&dyn DataStore>,
    reader: Arc<dyn DataReader>,
    locations: SourceLocations,
    charset: String,
    err: RsuadetectorError,
) -> RsuResult<SimpleDataStore> {
    match fallback {
        Some(store) => {
            debug!("使用回退存储的数据，版本：{}", store.data().version());
            Ok(SimpleDataStore::new(store.data(), reader, locations, charset)?.with_payload(store.payload()))
        }
        None => Err(err),
    }
}

impl DataStore for SimpleDataStore {
    fn data(&self) -> Arc<Data> {
        self.data.clone()
    }

    fn reader(&self) -> Arc<dyn DataReader> {
        self.reader.clone()
    }

    fn locations(&self) -> &SourceLocations {
        &self.locations
    }

    fn charset(&self) -> &str {
        &self.charset
    }

    fn payload(&self) -> Option<Arc<[u8]>> {
        self.payload.clone()
    }
}
