//! 全局错误类型定义

use regex::Error as RegexError;
use serde_json::Error as SerdeJsonError;
use std::io::Error as IoError;
use thiserror::Error;
use url::ParseError as UrlParseError;

#[derive(Error, Debug)]
pub enum RsuadetectorError {
    // 数据装配相关错误（调用方错误，立即返回）
    #[error("重复的记录ID：{kind} #{id}")]
    DuplicateId { kind: &'static str, id: u32 },
    #[error("数据缺少版本号")]
    MissingVersion,
    #[error("拒绝空数据集（EMPTY）")]
    EmptyData,

    // 数据读取相关错误
    #[error("数据读取失败：{0}")]
    DataReadError(String),
    #[error("正则编译失败：{0}")]
    RegexCompileError(#[from] RegexError),

    // 网络 / 数据源相关错误
    #[error("数据源拉取失败：{0}")]
    SourceError(String),
    #[error("网络请求失败：{0}")]
    HttpError(#[from] reqwest::Error),

    // 缓存持久化错误
    #[error("缓存文件写入失败：{0}")]
    PersistError(#[from] tempfile::PersistError),

    // 解析器相关错误
    #[error("解析器未初始化")]
    ParserNotInitialized,

    // 序列化/反序列化错误
    #[error("JSON解析失败：{0}")]
    JsonError(#[from] SerdeJsonError),

    // 基础错误
    #[error("IO操作失败：{0}")]
    IoError(#[from] IoError),
    #[error("URL解析失败：{0}")]
    UrlError(#[from] UrlParseError),
    #[error("无效输入：{0}")]
    InvalidInput(String),
}

// 全局Result类型
pub type RsuResult<T> = Result<T, RsuadetectorError>;
