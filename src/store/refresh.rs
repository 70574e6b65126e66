//! 可刷新数据存储
//! 由三部分组合而成：数据源（拉取字节与版本号）、快照单元（原子替换）、
//! 可选的缓存文件（持久化策略）。每轮更新在互斥锁内串行执行。

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::base::DataStore;
use super::cache::CacheFile;
use super::snapshot::SnapshotCell;
use super::source::{DataSource, SourceLocations, UrlDataSource};
use super::update::{PersistStatus, RefreshOutcome, is_newer};
use crate::config::StoreConfig;
use crate::data::{Data, DataReader, JsonDataReader};
use crate::error::{RsuResult, RsuadetectorError};

// 更新轮次之间共享的状态，只在持有锁时访问
#[derive(Debug)]
struct CycleState {
    cache: Option<CacheFile>,
}

/// 可刷新数据存储
#[derive(Debug)]
pub struct RefreshableStore {
    snapshot: SnapshotCell,
    source: Arc<dyn DataSource>,
    reader: Arc<dyn DataReader>,
    fallback: Option<Arc<dyn DataStore>>,
    cycle: Mutex<CycleState>,
    // 最近一次检查更新的时间（Unix 毫秒），0 表示尚未检查
    last_update_check: AtomicU64,
}

impl RefreshableStore {
    /// 无缓存：优先读取数据源，失败则使用回退存储
    pub async fn new(
        source: Arc<dyn DataSource>,
        reader: Arc<dyn DataReader>,
        fallback: Option<Arc<dyn DataStore>>,
    ) -> RsuResult<Self> {
        let initial = match read_source(source.as_ref(), reader.as_ref()).await {
            Ok(data) => Arc::new(data),
            Err(e) => {
                warn!("数据源读取失败：{}，尝试回退存储", e);
                fallback_data(fallback.as_deref()).ok_or(e)?
            }
        };
        Ok(Self::assemble(initial, source, reader, fallback, None))
    }

    /// 带缓存：缓存文件 -> 回退存储 -> 数据源，依次尝试
    ///
    /// 缓存不可用时，下一轮更新会无条件拉取数据并写入缓存文件；
    /// 数据源同样不可用时改用回退存储的原始字节写入。
    pub async fn with_cache(
        source: Arc<dyn DataSource>,
        reader: Arc<dyn DataReader>,
        cache_path: impl Into<PathBuf>,
        fallback: Option<Arc<dyn DataStore>>,
    ) -> RsuResult<Self> {
        let mut cache = CacheFile::new(cache_path);

        let initial = if let Some(data) = cache.load(reader.as_ref()).await {
            cache.mark_synced();
            Arc::new(data)
        } else if let Some(data) = fallback_data(fallback.as_deref()) {
            debug!("缓存不可用，使用回退存储的数据，版本：{}", data.version());
            data
        } else {
            debug!("缓存与回退存储均不可用，读取数据源");
            let data = read_source(source.as_ref(), reader.as_ref()).await?;
            Arc::new(data)
        };

        Ok(Self::assemble(initial, source, reader, fallback, Some(cache)))
    }

    /// 按配置创建（JSON 读取器；配置了缓存路径时启用缓存）
    pub async fn open(config: &StoreConfig, fallback: Option<Arc<dyn DataStore>>) -> RsuResult<Self> {
        let source: Arc<dyn DataSource> = Arc::new(UrlDataSource::from_config(config)?);
        let reader: Arc<dyn DataReader> = Arc::new(JsonDataReader);
        match &config.cache_path {
            Some(path) => Self::with_cache(source, reader, path.clone(), fallback).await,
            None => Self::new(source, reader, fallback).await,
        }
    }

    fn assemble(
        initial: Arc<Data>,
        source: Arc<dyn DataSource>,
        reader: Arc<dyn DataReader>,
        fallback: Option<Arc<dyn DataStore>>,
        cache: Option<CacheFile>,
    ) -> Self {
        debug!("数据存储初始化完成：{}", initial.stats());
        Self {
            snapshot: SnapshotCell::new(initial),
            source,
            reader,
            fallback,
            cycle: Mutex::new(CycleState { cache }),
            last_update_check: AtomicU64::new(0),
        }
    }

    /// 替换当前数据；拒绝空数据
    pub fn set_data(&self, data: Arc<Data>) -> RsuResult<()> {
        if data.is_empty() {
            return Err(RsuadetectorError::EmptyData);
        }
        self.install(data);
        Ok(())
    }

    fn install(&self, data: Arc<Data>) -> Arc<Data> {
        debug!("切换规则库快照：{}", data.stats());
        self.snapshot.replace(data)
    }

    pub fn version(&self) -> String {
        self.snapshot.version()
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    pub fn fallback(&self) -> Option<&Arc<dyn DataStore>> {
        self.fallback.as_ref()
    }

    /// 缓存文件路径（未启用缓存时为 None）
    pub async fn cache_path(&self) -> Option<PathBuf> {
        let state = self.cycle.lock().await;
        state.cache.as_ref().map(|c| c.path().to_path_buf())
    }

    /// 最近一次检查更新的时间
    pub fn last_update_check(&self) -> Option<SystemTime> {
        match self.last_update_check.load(Ordering::Acquire) {
            0 => None,
            millis => Some(UNIX_EPOCH + Duration::from_millis(millis)),
        }
    }

    fn touch_last_update_check(&self) {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(1)
            .max(1);
        self.last_update_check.store(millis, Ordering::Release);
    }

    /// 执行一轮更新；同一存储的多轮更新串行执行
    ///
    /// 网络错误、数据异常、版本号异常都只会让本轮放弃，当前数据保持不变；
    /// 此时若缓存文件尚未写入，则用回退存储的原始字节补写。
    pub async fn refresh(&self) -> RefreshOutcome {
        let mut state = self.cycle.lock().await;
        let outcome = self.run_cycle(&mut state).await;
        match &outcome {
            RefreshOutcome::Aborted { reason } => warn!("{}", reason),
            RefreshOutcome::Updated { .. } => info!("{}", outcome),
            _ => debug!("{}", outcome),
        }
        outcome
    }

    async fn run_cycle(&self, state: &mut CycleState) -> RefreshOutcome {
        // 0. 重试上一轮失败的缓存写入
        if let Some(cache) = state.cache.as_mut() {
            if let Some(Ok(())) = cache.retry_pending().await {
                info!("缓存文件补写成功：{}", cache.path().display());
            }
        }

        // 1. 拉取远程版本号
        self.touch_last_update_check();
        let remote_version = match self.source.fetch_version().await {
            Ok(version) => version,
            Err(e) => return self.populate_from_fallback(state, format!("拉取版本号失败：{}", e)).await,
        };

        // 2. 判断是否需要更新
        let current = self.snapshot.load();
        let newer = is_newer(&remote_version, current.version());
        let needs_population = state.cache.as_ref().is_some_and(CacheFile::needs_population);
        if !newer && !needs_population {
            debug!("无可用更新，当前版本：{}，远程版本：{}", current.version(), remote_version);
            return RefreshOutcome::UpToDate {
                version: current.version().to_string(),
            };
        }

        // 3. 拉取并装配新数据
        let bytes = match self.source.fetch_data().await {
            Ok(bytes) => bytes,
            Err(e) => return self.populate_from_fallback(state, format!("拉取数据失败：{}", e)).await,
        };
        let data = match self.reader.read(&bytes) {
            Ok(data) if !data.is_empty() => Arc::new(data),
            Ok(_) => return self.populate_from_fallback(state, "远程数据为空".to_string()).await,
            Err(e) => return self.populate_from_fallback(state, format!("远程数据解析失败：{}", e)).await,
        };

        // 4. 仅当数据版本确实更新时才切换
        let installed = is_newer(data.version(), current.version());
        if installed {
            self.install(data.clone());
        } else if !needs_population {
            return aborted(format!(
                "远程数据版本 {} 不比当前版本 {} 新",
                data.version(),
                current.version()
            ));
        }

        // 5. 写入缓存
        let persistence = match state.cache.as_mut() {
            None => PersistStatus::Disabled,
            Some(cache) => match cache.persist(bytes).await {
                Ok(()) => PersistStatus::Written,
                Err(_) => PersistStatus::Failed,
            },
        };

        if installed {
            RefreshOutcome::Updated {
                previous: current.version().to_string(),
                current: data.version().to_string(),
                persistence,
            }
        } else {
            RefreshOutcome::CachePopulated {
                version: data.version().to_string(),
                persistence,
            }
        }
    }

    // 数据源不可用且缓存文件尚未写入时，用回退存储的原始字节补写缓存
    async fn populate_from_fallback(&self, state: &mut CycleState, reason: String) -> RefreshOutcome {
        let Some(cache) = state.cache.as_mut().filter(|cache| cache.needs_population()) else {
            return aborted(reason);
        };
        let Some((data, bytes)) = self
            .fallback
            .as_ref()
            .and_then(|store| store.payload().map(|bytes| (store.data(), bytes)))
            .filter(|(data, _)| !data.is_empty())
        else {
            return aborted(reason);
        };

        warn!("{}，使用回退数据补写缓存：{}", reason, cache.path().display());
        let persistence = match cache.persist(bytes.to_vec()).await {
            Ok(()) => PersistStatus::Written,
            Err(_) => PersistStatus::Failed,
        };

        let current = self.snapshot.load();
        if is_newer(data.version(), current.version()) {
            self.install(data.clone());
            RefreshOutcome::Updated {
                previous: current.version().to_string(),
                current: data.version().to_string(),
                persistence,
            }
        } else {
            RefreshOutcome::CachePopulated {
                version: data.version().to_string(),
                persistence,
            }
        }
    }
}

fn aborted(reason: String) -> RefreshOutcome {
    RefreshOutcome::Aborted { reason }
}

async fn read_source(source: &dyn DataSource, reader: &dyn DataReader) -> RsuResult<Data> {
    let bytes = source.fetch_data().await?;
    let data = reader.read(&bytes)?;
    if data.is_empty() {
        return Err(RsuadetectorError::EmptyData);
    }
    Ok(data)
}

fn fallback_data(fallback: Option<&dyn DataStore>) -> Option<Arc<Data>> {
    fallback.map(|store| store.data()).filter(|data| !data.is_empty())
}

impl DataStore for RefreshableStore {
    fn data(&self) -> Arc<Data> {
        self.snapshot.load()
    }

    fn reader(&self) -> Arc<dyn DataReader> {
        self.reader.clone()
    }

    fn locations(&self) -> &SourceLocations {
        self.source.locations()
    }

    fn charset(&self) -> &str {
        self.source.charset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataBuilder;
    use crate::store::SimpleDataStore;
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use url::Url;

    /// 内存数据源，便于控制每轮返回的内容
    #[derive(Debug)]
    struct MemorySource {
        locations: SourceLocations,
        version: StdMutex<Option<String>>,
        payload: StdMutex<Option<Vec<u8>>>,
    }

    impl MemorySource {
        fn new(version: &str, payload: Option<&str>) -> Self {
            Self {
                locations: locations(),
                version: StdMutex::new(Some(version.to_string())),
                payload: StdMutex::new(payload.map(|p| p.as_bytes().to_vec())),
            }
        }

        fn set(&self, version: &str, payload: Option<&str>) {
            *self.version.lock().unwrap() = Some(version.to_string());
            *self.payload.lock().unwrap() = payload.map(|p| p.as_bytes().to_vec());
        }

        fn fail_version(&self) {
            *self.version.lock().unwrap() = None;
        }
    }

    #[async_trait]
    impl DataSource for MemorySource {
        async fn fetch_data(&self) -> RsuResult<Vec<u8>> {
            self.payload
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| RsuadetectorError::SourceError("no payload".into()))
        }

        async fn fetch_version(&self) -> RsuResult<String> {
            self.version
                .lock()
                .unwrap()
                .clone()
                .ok_or_else(|| RsuadetectorError::SourceError("offline".into()))
        }

        fn locations(&self) -> &SourceLocations {
            &self.locations
        }

        fn charset(&self) -> &str {
            "UTF-8"
        }
    }

    fn locations() -> SourceLocations {
        SourceLocations {
            data_url: Url::parse("http://localhost/data").unwrap(),
            version_url: Url::parse("http://localhost/version").unwrap(),
            definition_url: Url::parse("http://localhost/def").unwrap(),
        }
    }

    fn payload(version: &str) -> String {
        format!(r#"{{"version": "{}"}}"#, version)
    }

    fn fallback(version: &str) -> Arc<dyn DataStore> {
        Arc::new(
            SimpleDataStore::from_bytes(payload(version).as_bytes(), Arc::new(JsonDataReader), locations(), "UTF-8")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_new_prefers_primary_then_fallback() {
        let source = Arc::new(MemorySource::new("20240101-01", Some(&payload("20240101-01"))));
        let store = RefreshableStore::new(source, Arc::new(JsonDataReader), Some(fallback("fallback")))
            .await
            .unwrap();
        assert_eq!(store.version(), "20240101-01");

        let source = Arc::new(MemorySource::new("20240101-01", None));
        let store = RefreshableStore::new(source.clone(), Arc::new(JsonDataReader), Some(fallback("fallback")))
            .await
            .unwrap();
        assert_eq!(store.version(), "fallback");

        assert!(RefreshableStore::new(source, Arc::new(JsonDataReader), None).await.is_err());
    }

    #[tokio::test]
    async fn test_set_data_rejects_empty() {
        let source = Arc::new(MemorySource::new("1", Some(&payload("1"))));
        let store = RefreshableStore::new(source, Arc::new(JsonDataReader), None).await.unwrap();
        assert!(matches!(store.set_data(Data::empty()), Err(RsuadetectorError::EmptyData)));
        assert_eq!(store.version(), "1");

        let mut builder = DataBuilder::new();
        builder.set_version("2");
        store.set_data(Arc::new(builder.build().unwrap())).unwrap();
        assert_eq!(store.version(), "2");
    }

    #[tokio::test]
    async fn test_refresh_cycle_without_cache() {
        let source = Arc::new(MemorySource::new("20240101-01", Some(&payload("20240101-01"))));
        let store = RefreshableStore::new(source.clone(), Arc::new(JsonDataReader), None)
            .await
            .unwrap();
        assert!(store.last_update_check().is_none());

        assert_eq!(
            store.refresh().await,
            RefreshOutcome::UpToDate { version: "20240101-01".into() }
        );
        assert!(store.last_update_check().is_some());

        source.set("20240201-01", Some(&payload("20240201-01")));
        assert_eq!(
            store.refresh().await,
            RefreshOutcome::Updated {
                previous: "20240101-01".into(),
                current: "20240201-01".into(),
                persistence: PersistStatus::Disabled,
            }
        );
        assert_eq!(store.version(), "20240201-01");

        // 版本号异常：保留当前数据
        source.set("<html>error</html>", Some(&payload("20991231-01")));
        assert!(matches!(store.refresh().await, RefreshOutcome::UpToDate { .. }));
        assert_eq!(store.version(), "20240201-01");

        // 网络异常
        source.fail_version();
        assert!(matches!(store.refresh().await, RefreshOutcome::Aborted { .. }));
        assert_eq!(store.version(), "20240201-01");

        // 数据异常
        source.set("20240301-01", Some("{ broken"));
        assert!(matches!(store.refresh().await, RefreshOutcome::Aborted { .. }));
        assert_eq!(store.version(), "20240201-01");

        // 版本号更新但数据版本并不更新
        source.set("20240301-01", Some(&payload("20240101-01")));
        assert!(matches!(store.refresh().await, RefreshOutcome::Aborted { .. }));
        assert_eq!(store.version(), "20240201-01");
    }

    #[tokio::test]
    async fn test_with_cache_seeds_from_fallback_and_populates() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("uas.json");
        let source = Arc::new(MemorySource::new("20240101-01", Some(&payload("20240101-01"))));

        let store = RefreshableStore::with_cache(
            source.clone(),
            Arc::new(JsonDataReader),
            &cache_path,
            Some(fallback("20230101-01")),
        )
        .await
        .unwrap();
        assert_eq!(store.version(), "20230101-01");
        assert!(!cache_path.exists());

        let outcome = store.refresh().await;
        assert_eq!(
            outcome,
            RefreshOutcome::Updated {
                previous: "20230101-01".into(),
                current: "20240101-01".into(),
                persistence: PersistStatus::Written,
            }
        );
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), payload("20240101-01"));
        assert_eq!(store.cache_path().await, Some(cache_path.clone()));

        // 重新打开时直接使用缓存
        let reopened = RefreshableStore::with_cache(source, Arc::new(JsonDataReader), &cache_path, Some(fallback("x")))
            .await
            .unwrap();
        assert_eq!(reopened.version(), "20240101-01");
    }

    #[tokio::test]
    async fn test_cache_population_without_newer_version() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("uas.json");
        // 回退数据比远程数据新：补写缓存但不切换
        let source = Arc::new(MemorySource::new("20240101-01", Some(&payload("20240101-01"))));
        let store = RefreshableStore::with_cache(
            source,
            Arc::new(JsonDataReader),
            &cache_path,
            Some(fallback("20250101-01")),
        )
        .await
        .unwrap();

        assert_eq!(
            store.refresh().await,
            RefreshOutcome::CachePopulated {
                version: "20240101-01".into(),
                persistence: PersistStatus::Written,
            }
        );
        assert_eq!(store.version(), "20250101-01");
        assert!(cache_path.is_file());

        // 缓存已写入，之后不再重复拉取
        assert!(matches!(store.refresh().await, RefreshOutcome::UpToDate { .. }));
    }

    #[tokio::test]
    async fn test_offline_source_populates_cache_from_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("uas.json");
        let source = Arc::new(MemorySource::new("20240101-01", None));
        source.fail_version();

        let store = RefreshableStore::with_cache(
            source.clone(),
            Arc::new(JsonDataReader),
            &cache_path,
            Some(fallback("20230101-01")),
        )
        .await
        .unwrap();
        assert_eq!(store.version(), "20230101-01");
        assert!(!cache_path.exists());

        assert_eq!(
            store.refresh().await,
            RefreshOutcome::CachePopulated {
                version: "20230101-01".into(),
                persistence: PersistStatus::Written,
            }
        );
        assert_eq!(std::fs::read_to_string(&cache_path).unwrap(), payload("20230101-01"));

        // 缓存已写入：之后的离线轮次只放弃，不再改写缓存
        assert!(matches!(store.refresh().await, RefreshOutcome::Aborted { .. }));

        // 数据异常时同样补写
        let other = dir.path().join("other.json");
        source.set("20240101-01", Some("{ broken"));
        let store = RefreshableStore::with_cache(source, Arc::new(JsonDataReader), &other, Some(fallback("20230101-01")))
            .await
            .unwrap();
        assert!(matches!(store.refresh().await, RefreshOutcome::CachePopulated { .. }));
        assert_eq!(std::fs::read_to_string(&other).unwrap(), payload("20230101-01"));
    }

    #[tokio::test]
    async fn test_offline_source_without_fallback_bytes_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("uas.json");
        let source = Arc::new(MemorySource::new("20240101-01", None));
        source.fail_version();

        // 只有快照、没有原始字节的回退存储无法补写缓存
        let snapshot_only: Arc<dyn DataStore> =
            Arc::new(SimpleDataStore::new(fallback("20230101-01").data(), Arc::new(JsonDataReader), locations(), "UTF-8").unwrap());
        let store = RefreshableStore::with_cache(source, Arc::new(JsonDataReader), &cache_path, Some(snapshot_only))
            .await
            .unwrap();
        assert!(matches!(store.refresh().await, RefreshOutcome::Aborted { .. }));
        assert!(!cache_path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_treated_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let cache_path = dir.path().join("uas.json");
        std::fs::write(&cache_path, b"\x00\x01garbage").unwrap();

        let source = Arc::new(MemorySource::new("20240101-01", None));
        let store = RefreshableStore::with_cache(source.clone(), Arc::new(JsonDataReader), &cache_path, None).await;
        assert!(store.is_err());

        let store = RefreshableStore::with_cache(source, Arc::new(JsonDataReader), &cache_path, Some(fallback("1")))
            .await
            .unwrap();
        assert_eq!(store.version(), "1");
    }
}
