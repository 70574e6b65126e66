//! 规则库读取器
//! 把原始字节解析为记录，再交给装配器生成快照

use std::fmt::Debug;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::builder::{BrowserEntry, DataBuilder, DeviceEntry, Diagnostic, OperatingSystemEntry, PatternKind};
use super::record::{DataRecords, PatternRecord};
use super::snapshot::Data;
use crate::error::{RsuResult, RsuadetectorError};
use crate::model::{BrowserOperatingSystemMapping, BrowserType, OrderedPattern, Robot, Vendor};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// 文档外层结构；数组元素逐条转换，单条记录损坏不影响整份文档
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    version: String,
    #[serde(default)]
    browser_types: Vec<Value>,
    #[serde(default)]
    browsers: Vec<Value>,
    #[serde(default)]
    browser_patterns: Vec<Value>,
    #[serde(default)]
    operating_systems: Vec<Value>,
    #[serde(default)]
    operating_system_patterns: Vec<Value>,
    #[serde(default)]
    browser_os: Vec<Value>,
    #[serde(default)]
    robots: Vec<Value>,
    #[serde(default)]
    devices: Vec<Value>,
    #[serde(default)]
    device_patterns: Vec<Value>,
}

fn records<T: DeserializeOwned>(kind: &'static str, values: Vec<Value>, diagnostics: &mut Vec<Diagnostic>) -> Vec<T> {
    let mut out = Vec::with_capacity(values.len());
    for value in values {
        let id = value.get("id").and_then(Value::as_u64).and_then(|id| u32::try_from(id).ok()).unwrap_or(0);
        match serde_json::from_value(value) {
            Ok(record) => out.push(record),
            Err(e) => diagnostics.push(Diagnostic::InvalidRecord { kind, id, reason: e.to_string() }),
        }
    }
    out
}

/// 规则库读取器
pub trait DataReader: Debug + Send + Sync {
    /// 解析字节流，返回快照与被跳过记录的诊断
    fn read_with_diagnostics(&self, bytes: &[u8]) -> RsuResult<(Data, Vec<Diagnostic>)>;

    /// 解析字节流，诊断信息仅记录日志
    fn read(&self, bytes: &[u8]) -> RsuResult<Data> {
        let (data, diagnostics) = self.read_with_diagnostics(bytes)?;
        for diagnostic in &diagnostics {
            warn!("规则记录已跳过：{}", diagnostic);
        }
        Ok(data)
    }
}

/// JSON 格式读取器
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDataReader;

impl JsonDataReader {
    pub fn new() -> Self {
        Self
    }

    /// 仅解析原始记录，字段不合法的单条记录跳过并给出诊断
    pub fn read_records(&self, bytes: &[u8]) -> RsuResult<(DataRecords, Vec<Diagnostic>)> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(RsuadetectorError::DataReadError("数据内容为空".to_string()));
        }
        let raw: RawDocument = serde_json::from_slice(bytes)?;
        let mut diagnostics = Vec::new();
        let records = DataRecords {
            version: raw.version,
            browser_types: records("browser_type", raw.browser_types, &mut diagnostics),
            browsers: records("browser", raw.browsers, &mut diagnostics),
            browser_patterns: records("browser_pattern", raw.browser_patterns, &mut diagnostics),
            operating_systems: records("operating_system", raw.operating_systems, &mut diagnostics),
            operating_system_patterns: records(
                "operating_system_pattern",
                raw.operating_system_patterns,
                &mut diagnostics,
            ),
            browser_os: records("browser_os", raw.browser_os, &mut diagnostics),
            robots: records("robot", raw.robots, &mut diagnostics),
            devices: records("device", raw.devices, &mut diagnostics),
            device_patterns: records("device_pattern", raw.device_patterns, &mut diagnostics),
        };
        debug!(
            "规则记录解析成功，版本：{}，浏览器 {} 条，操作系统 {} 条，爬虫 {} 条",
            records.version,
            records.browsers.len(),
            records.operating_systems.len(),
            records.robots.len()
        );
        Ok((records, diagnostics))
    }

    /// 将原始记录装配为快照，`diagnostics` 为解析阶段已产生的诊断
    pub fn assemble(&self, records: DataRecords, diagnostics: Vec<Diagnostic>) -> RsuResult<(Data, Vec<Diagnostic>)> {
        let mut builder = DataBuilder::new();
        builder.set_version(records.version);
        for diagnostic in diagnostics {
            builder.add_diagnostic(diagnostic);
        }

        for record in records.browser_types {
            builder.append_browser_type(BrowserType { id: record.id, name: record.name })?;
        }
        for record in records.browsers {
            builder.append_browser(BrowserEntry {
                id: record.id,
                type_id: record.type_id,
                family: record.family,
                name: record.name,
                vendor: Vendor {
                    producer: record.company,
                    producer_url: record.url_company,
                    url: record.url,
                    icon: record.icon,
                    info_url: record.browser_info_url,
                },
            })?;
        }
        for record in records.operating_systems {
            builder.append_operating_system(OperatingSystemEntry {
                id: record.id,
                family_name: record.family,
                name: record.name,
                vendor: Vendor {
                    producer: record.company,
                    producer_url: record.url_company,
                    url: record.url,
                    icon: record.icon,
                    info_url: record.os_info_url,
                },
            })?;
        }
        for record in records.robots {
            if record.useragent.is_empty() {
                builder.add_diagnostic(Diagnostic::InvalidRecord {
                    kind: "robot",
                    id: record.id,
                    reason: "UA 字符串为空".to_string(),
                });
                continue;
            }
            builder.append_robot(Robot {
                id: record.id,
                user_agent_string: record.useragent,
                family: record.family,
                name: record.name,
                vendor: Vendor {
                    producer: record.company,
                    producer_url: record.url_company,
                    url: record.url,
                    icon: record.icon,
                    info_url: record.bot_info_url,
                },
            })?;
        }
        for record in records.devices {
            builder.append_device(DeviceEntry {
                id: record.id,
                name: record.name,
                icon: record.icon,
                info_url: record.device_info_url,
            })?;
        }
        for record in records.browser_os {
            builder.append_browser_os_mapping(BrowserOperatingSystemMapping {
                browser_id: record.browser_id,
                operating_system_id: record.os_id,
            });
        }

        for record in records.browser_patterns {
            if let Some(pattern) = compile(&mut builder, PatternKind::Browser, &record) {
                builder.append_browser_pattern(pattern)?;
            }
        }
        for record in records.operating_system_patterns {
            if let Some(pattern) = compile(&mut builder, PatternKind::OperatingSystem, &record) {
                builder.append_operating_system_pattern(pattern)?;
            }
        }
        for record in records.device_patterns {
            if let Some(pattern) = compile(&mut builder, PatternKind::Device, &record) {
                builder.append_device_pattern(pattern)?;
            }
        }

        builder.build_with_diagnostics()
    }
}

// 编译失败的正则只跳过当前记录
fn compile(builder: &mut DataBuilder, kind: PatternKind, record: &PatternRecord) -> Option<OrderedPattern> {
    match OrderedPattern::from_perl(record.id, record.order, &record.regstring) {
        Ok(pattern) => Some(pattern),
        Err(e) => {
            builder.add_diagnostic(Diagnostic::InvalidPattern {
                kind,
                id: record.id,
                position: record.order,
                reason: e.to_string(),
            });
            None
        }
    }
}

impl DataReader for JsonDataReader {
    fn read_with_diagnostics(&self, bytes: &[u8]) -> RsuResult<(Data, Vec<Diagnostic>)> {
        let (records, diagnostics) = self.read_records(bytes)?;
        self.assemble(records, diagnostics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "version": "20240301-01",
        "browser_types": [{"id": 1, "type": "Browser"}],
        "browsers": [
            {"id": 1, "type": 1, "family": "Chrome", "company": "Google Inc."},
            {"id": 2, "type": 3, "family": "Lost"}
        ],
        "browser_patterns": [
            {"id": 1, "order": 10, "regstring": "/chrome\\/([0-9.]+)/si"},
            {"id": 1, "order": 11, "regstring": "/broken(/si"}
        ],
        "operating_systems": [{"id": 7, "family": "Linux", "name": "Linux"}],
        "operating_system_patterns": [{"id": 7, "order": 1, "regstring": "/linux/si"}],
        "robots": [{"id": 3, "useragent": "", "family": "Empty"}]
    }"#;

    #[test]
    fn test_read_sample_with_diagnostics() {
        let (data, diagnostics) = JsonDataReader::new().read_with_diagnostics(SAMPLE.as_bytes()).unwrap();
        assert_eq!(data.version(), "20240301-01");
        assert_eq!(data.browsers().count(), 1);
        assert_eq!(data.browser(1).unwrap().vendor.producer, "Google Inc.");
        assert_eq!(data.browser_patterns().len(), 1);
        assert_eq!(data.operating_system_patterns().len(), 1);
        assert!(data.robots().is_empty());
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidPattern { position: 11, .. })));
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::MissingBrowserType { browser_id: 2, .. })));
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidRecord { kind: "robot", .. })));
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let document = r#"{
            "version": "20240301-01",
            "browser_types": [{"id": 1, "type": "Browser"}],
            "browsers": [
                {"id": 1, "type": 1, "family": "Chrome"},
                {"id": 2, "family": "Broken"},
                {"id": "x", "type": 1}
            ],
            "browser_patterns": [{"id": 1, "order": 10, "regstring": "/chrome/si"}, {"id": 1}]
        }"#;
        let (data, diagnostics) = JsonDataReader::new().read_with_diagnostics(document.as_bytes()).unwrap();
        assert_eq!(data.browsers().count(), 1);
        assert_eq!(data.browser(1).unwrap().family, "Chrome");
        assert_eq!(data.browser_patterns().len(), 1);
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidRecord { kind: "browser", id: 2, .. })));
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidRecord { kind: "browser", id: 0, .. })));
        assert!(diagnostics.iter().any(|d| matches!(d, Diagnostic::InvalidRecord { kind: "browser_pattern", id: 1, .. })));
        assert_eq!(diagnostics.len(), 3);
    }

    #[test]
    fn test_read_with_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(br#"{"version": "1"}"#);
        let data = JsonDataReader::new().read(&bytes).unwrap();
        assert_eq!(data.version(), "1");
    }

    #[test]
    fn test_read_rejects_empty_and_garbage() {
        let reader = JsonDataReader::new();
        assert!(reader.read(b"").is_err());
        assert!(reader.read(b"   \n").is_err());
        assert!(reader.read(b"<html>502 Bad Gateway</html>").is_err());
        // 缺少版本号
        assert!(matches!(reader.read(b"{}"), Err(RsuadetectorError::MissingVersion)));
    }
}
