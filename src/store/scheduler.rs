//! 后台更新调度
//! 启动后立即执行一轮更新，此后每轮结束再等待固定间隔；修改间隔会重新调度。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::refresh::RefreshableStore;
use crate::error::{RsuResult, RsuadetectorError};

#[derive(Debug)]
struct Running {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Running {
    // 通知任务在当前轮次结束后退出
    fn signal(&self) {
        let _ = self.shutdown.send(true);
    }
}

#[derive(Debug)]
struct Inner {
    interval: Duration,
    running: Option<Running>,
}

/// 更新调度器，持有唯一的后台更新任务
#[derive(Debug)]
pub struct UpdateScheduler {
    store: Arc<RefreshableStore>,
    runtime: Handle,
    inner: Mutex<Inner>,
}

impl UpdateScheduler {
    /// 在当前 tokio 运行时上启动调度
    pub fn start(store: Arc<RefreshableStore>, interval: Duration) -> RsuResult<Self> {
        validate_interval(interval)?;
        let runtime = Handle::try_current()
            .map_err(|e| RsuadetectorError::InvalidInput(format!("更新调度需要 tokio 运行时：{}", e)))?;

        let running = spawn(&runtime, store.clone(), interval);
        Ok(Self {
            store,
            runtime,
            inner: Mutex::new(Inner {
                interval,
                running: Some(running),
            }),
        })
    }

    pub fn store(&self) -> &Arc<RefreshableStore> {
        &self.store
    }

    pub fn interval(&self) -> Duration {
        self.lock().interval
    }

    /// 修改更新间隔：旧任务在当前轮次结束后退出，新任务立即执行一轮
    pub fn set_interval(&self, interval: Duration) -> RsuResult<()> {
        validate_interval(interval)?;
        let mut inner = self.lock();
        if let Some(old) = inner.running.take() {
            old.signal();
        }
        inner.interval = interval;
        inner.running = Some(spawn(&self.runtime, self.store.clone(), interval));
        info!("更新间隔已调整为 {:?}", interval);
        Ok(())
    }

    /// 停止调度；进行中的一轮更新会执行完毕
    pub fn stop(&self) {
        if let Some(running) = self.lock().running.take() {
            running.signal();
            debug!("更新调度已停止");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock()
            .running
            .as_ref()
            .is_some_and(|r| !r.handle.is_finished())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for UpdateScheduler {
    fn drop(&mut self) {
        if let Some(running) = self.lock().running.take() {
            running.signal();
            running.handle.abort();
        }
    }
}

fn validate_interval(interval: Duration) -> RsuResult<()> {
    if interval.is_zero() {
        return Err(RsuadetectorError::InvalidInput("更新间隔必须大于 0".to_string()));
    }
    Ok(())
}

fn spawn(runtime: &Handle, store: Arc<RefreshableStore>, interval: Duration) -> Running {
    let (shutdown, receiver) = watch::channel(false);
    let handle = runtime.spawn(update_task(store, interval, receiver));
    Running { shutdown, handle }
}

async fn update_task(store: Arc<RefreshableStore>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        store.refresh().await;

        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                // 发送端已释放同样视为退出
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
    debug!("后台更新任务退出");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::JsonDataReader;
    use crate::store::{DataSource, SourceLocations};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use url::Url;

    /// 只统计版本号请求次数的数据源
    #[derive(Debug)]
    struct CountingSource {
        locations: SourceLocations,
        version_calls: AtomicUsize,
    }

    #[async_trait]
    impl DataSource for CountingSource {
        async fn fetch_data(&self) -> RsuResult<Vec<u8>> {
            Ok(br#"{"version": "20240101-01"}"#.to_vec())
        }

        async fn fetch_version(&self) -> RsuResult<String> {
            self.version_calls.fetch_add(1, Ordering::SeqCst);
            Ok("20240101-01".to_string())
        }

        fn locations(&self) -> &SourceLocations {
            &self.locations
        }

        fn charset(&self) -> &str {
            "UTF-8"
        }
    }

    async fn store() -> (Arc<CountingSource>, Arc<RefreshableStore>) {
        let source = Arc::new(CountingSource {
            locations: SourceLocations {
                data_url: Url::parse("http://localhost/data").unwrap(),
                version_url: Url::parse("http://localhost/version").unwrap(),
                definition_url: Url::parse("http://localhost/def").unwrap(),
            },
            version_calls: AtomicUsize::new(0),
        });
        let store = RefreshableStore::new(source.clone(), Arc::new(JsonDataReader), None)
            .await
            .unwrap();
        (source, Arc::new(store))
    }

    #[tokio::test]
    async fn test_runs_immediately_then_periodically() {
        let (source, store) = store().await;
        let scheduler = UpdateScheduler::start(store, Duration::from_millis(50)).unwrap();
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(source.version_calls.load(Ordering::SeqCst) >= 1);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(source.version_calls.load(Ordering::SeqCst) >= 3);
        assert!(scheduler.store().last_update_check().is_some());
    }

    #[tokio::test]
    async fn test_zero_interval_is_rejected() {
        let (_, store) = store().await;
        assert!(UpdateScheduler::start(store.clone(), Duration::ZERO).is_err());

        let scheduler = UpdateScheduler::start(store, Duration::from_secs(60)).unwrap();
        assert!(scheduler.set_interval(Duration::ZERO).is_err());
        assert_eq!(scheduler.interval(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_reschedule_runs_immediately() {
        let (source, store) = store().await;
        let scheduler = UpdateScheduler::start(store, Duration::from_secs(3600)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.version_calls.load(Ordering::SeqCst), 1);

        scheduler.set_interval(Duration::from_secs(1800)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.version_calls.load(Ordering::SeqCst), 2);
        assert_eq!(scheduler.interval(), Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn test_stop_ends_task() {
        let (source, store) = store().await;
        let scheduler = UpdateScheduler::start(store, Duration::from_millis(20)).unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!scheduler.is_running());

        let calls = source.version_calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(source.version_calls.load(Ordering::SeqCst), calls);
    }
}
