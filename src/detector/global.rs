//! 全局解析器单例管理
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::parser::UpdatingUserAgentStringParser;
use super::result::UserAgent;
use crate::config::{ConfigManager, StoreConfig};
use crate::error::{RsuResult, RsuadetectorError};
use crate::store::DataStore;

/// 全局解析器实例
static GLOBAL_PARSER: Lazy<Arc<OnceCell<UpdatingUserAgentStringParser>>> = Lazy::new(|| Arc::new(OnceCell::new()));

/// 初始化全局解析器（默认配置）
pub async fn init_global_parser() -> RsuResult<()> {
    init_global_parser_with_config(ConfigManager::get_default(), None).await
}

/// 带自定义配置与回退存储初始化全局解析器；重复调用直接返回
pub async fn init_global_parser_with_config(
    config: StoreConfig,
    fallback: Option<Arc<dyn DataStore>>,
) -> RsuResult<()> {
    GLOBAL_PARSER
        .get_or_try_init(|| async move { UpdatingUserAgentStringParser::open(&config, fallback).await })
        .await?;
    Ok(())
}

/// 获取全局解析器
pub fn get_global_parser() -> RsuResult<&'static UpdatingUserAgentStringParser> {
    GLOBAL_PARSER.get().ok_or(RsuadetectorError::ParserNotInitialized)
}

/// 使用全局解析器解析 UA 字符串
pub fn parse_user_agent(user_agent: &str) -> RsuResult<UserAgent> {
    Ok(get_global_parser()?.parse(user_agent))
}
