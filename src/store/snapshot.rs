//! 快照引用单元：单写多读的原子替换

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::data::Data;

/// 持有当前 `Data` 的原子引用
///
/// 读取方每次拿到完整的快照引用，替换是一次指针交换，不会出现新旧数据混读。
pub struct SnapshotCell {
    current: ArcSwap<Data>,
}

impl SnapshotCell {
    pub fn new(data: Arc<Data>) -> Self {
        Self {
            current: ArcSwap::new(data),
        }
    }

    /// 读取当前快照
    pub fn load(&self) -> Arc<Data> {
        self.current.load_full()
    }

    /// 替换快照，返回旧快照
    pub fn replace(&self, data: Arc<Data>) -> Arc<Data> {
        self.current.swap(data)
    }

    pub fn version(&self) -> String {
        self.current.load().version().to_string()
    }
}

impl fmt::Debug for SnapshotCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotCell")
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataBuilder;

    fn data(version: &str) -> Arc<Data> {
        let mut builder = DataBuilder::new();
        builder.set_version(version);
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn test_replace_returns_previous() {
        let cell = SnapshotCell::new(data("1"));
        let before = cell.load();
        let old = cell.replace(data("2"));
        assert_eq!(old.version(), "1");
        assert_eq!(cell.version(), "2");
        // 已取得的快照不受替换影响
        assert_eq!(before.version(), "1");
    }
}
