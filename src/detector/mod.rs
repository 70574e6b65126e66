//! 识别模块：级联识别引擎、解析器门面与全局单例
pub mod classifier;
pub mod global;
pub mod os_version;
pub mod parser;
pub mod result;

pub use self::classifier::{Classifier, classify};
pub use self::global::{get_global_parser, init_global_parser, init_global_parser_with_config, parse_user_agent};
pub use self::os_version::{Normalization, OsVersionRules, VersionRule};
pub use self::parser::{UpdatingUserAgentStringParser, UserAgentStringParser};
pub use self::result::{DeviceInfo, OperatingSystemInfo, UserAgent};
