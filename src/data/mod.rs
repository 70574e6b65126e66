//! 规则库数据：原始记录、装配器、不可变快照、读取器

pub mod builder;
pub mod reader;
pub mod record;
pub mod snapshot;

pub use builder::{BrowserEntry, DataBuilder, DeviceEntry, Diagnostic, OperatingSystemEntry, PatternKind};
pub use reader::{DataReader, JsonDataReader};
pub use record::DataRecords;
pub use snapshot::{Data, DataStats};
