//! 本地缓存文件
//! 缓存文件只保存最近一次成功拉取的原始数据字节，空文件或无法解析的文件等同于无缓存
//!
//! 写入方式：先在目标文件所在目录写临时文件，再重命名覆盖目标文件。
//! 写入失败时目标文件保持原样，待写入的字节保留到下一轮更新重试。

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::data::{Data, DataReader};
use crate::error::RsuResult;

/// 缓存文件状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheState {
    /// 与内存中的数据一致
    Synced,
    /// 缓存缺失或损坏，下一轮更新需要写入
    NeedsPopulation,
    /// 上次写入失败，保留待写入的字节
    Pending(Vec<u8>),
}

/// 缓存文件持久化策略
#[derive(Debug)]
pub struct CacheFile {
    path: PathBuf,
    state: CacheState,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: CacheState::NeedsPopulation,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn needs_population(&self) -> bool {
        self.state == CacheState::NeedsPopulation
    }

    pub(crate) fn mark_synced(&mut self) {
        self.state = CacheState::Synced;
    }

    /// 读取并解析缓存文件；缺失、为空或损坏均返回 None
    pub async fn load(&self, reader: &dyn DataReader) -> Option<Data> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("缓存文件 {} 不可读：{}", self.path.display(), e);
                return None;
            }
        };
        match reader.read(&bytes) {
            Ok(data) if !data.is_empty() => {
                debug!("缓存文件加载成功：{}", data.stats());
                Some(data)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("缓存文件 {} 已损坏，视为无缓存：{}", self.path.display(), e);
                None
            }
        }
    }

    /// 写入缓存；失败时保留字节等待重试
    pub async fn persist(&mut self, bytes: Vec<u8>) -> RsuResult<()> {
        match write_atomic(&self.path, &bytes).await {
            Ok(()) => {
                debug!("缓存文件已更新：{}（{} 字节）", self.path.display(), bytes.len());
                self.state = CacheState::Synced;
                Ok(())
            }
            Err(e) => {
                warn!("缓存文件 {} 写入失败，下一轮重试：{}", self.path.display(), e);
                self.state = CacheState::Pending(bytes);
                Err(e)
            }
        }
    }

    /// 重试上次失败的写入；没有待写入内容时返回 None
    pub async fn retry_pending(&mut self) -> Option<RsuResult<()>> {
        let bytes = match std::mem::replace(&mut self.state, CacheState::Synced) {
            CacheState::Pending(bytes) => bytes,
            other => {
                self.state = other;
                return None;
            }
        };
        Some(self.persist(bytes).await)
    }
}

/// 原子写入：同目录临时文件 + 重命名覆盖
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> RsuResult<()> {
    let path = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> RsuResult<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(&bytes)?;
        temp.as_file().sync_all()?;
        temp.persist(&path)?;
        Ok(())
    })
    .await
    .map_err(std::io::Error::from)?
}
