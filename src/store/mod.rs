//! 数据存储层
//! 基础存储 -> 可刷新存储 -> 带缓存的可刷新存储，以及后台更新调度

mod base;
mod cache;
mod refresh;
mod scheduler;
mod snapshot;
mod source;
mod update;

pub use base::{DataStore, SimpleDataStore};
pub use cache::{CacheFile, CacheState, write_atomic};
pub use refresh::RefreshableStore;
pub use scheduler::UpdateScheduler;
pub use snapshot::SnapshotCell;
pub use source::{DataSource, SourceLocations, UrlDataSource, first_line};
pub use update::{MAX_VERSION_LEN, PersistStatus, RefreshOutcome, is_newer, is_well_formed_version};
