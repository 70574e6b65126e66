//! rsuadetector 命令行工具
//! 加载规则库后识别命令行参数（或标准输入每行）中的 UA 字符串，以 JSON 输出结果

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rsuadetector::{
    ConfigManager, DataStore, JsonDataReader, RefreshableStore, RetryPolicy, SimpleDataStore, UserAgentStringParser,
};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "rsuadetector", version)]
#[command(about = "Classify User-Agent strings against a versioned pattern database")]
struct Args {
    /// UA strings to classify; reads stdin line by line when omitted
    user_agents: Vec<String>,

    /// Local data file, used as the fallback store
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Cache file for the downloaded data
    #[arg(short, long, value_name = "PATH")]
    cache: Option<PathBuf>,

    /// Data URL
    #[arg(long, value_name = "URL")]
    data_url: Option<String>,

    /// Version URL
    #[arg(long, value_name = "URL")]
    version_url: Option<String>,

    /// Only use the local data file, never contact the data source
    #[arg(long, requires = "file")]
    offline: bool,

    /// Retries per fetch
    #[arg(long, default_value_t = 0)]
    retries: u8,

    /// Compact JSON output
    #[arg(long)]
    compact: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "rsuadetector=debug" } else { "rsuadetector=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    let mut builder = ConfigManager::custom();
    if let Some(url) = &args.data_url {
        builder = builder.data_url(url);
    }
    if let Some(url) = &args.version_url {
        builder = builder.version_url(url);
    }
    if let Some(path) = &args.cache {
        builder = builder.cache_path(path);
    }
    if args.retries > 0 {
        builder = builder.retry(RetryPolicy::Times(args.retries));
    }
    let config = builder.build().context("invalid configuration")?;

    let fallback: Option<Arc<dyn DataStore>> = match &args.file {
        Some(path) => {
            let store =
                SimpleDataStore::from_file(path, Arc::new(JsonDataReader), config.locations()?, config.charset.clone())
                    .await
                    .with_context(|| format!("failed to load data file {}", path.display()))?;
            Some(Arc::new(store))
        }
        None => None,
    };

    let store: Arc<dyn DataStore> = match fallback {
        Some(store) if args.offline => store,
        fallback => {
            let store = RefreshableStore::open(&config, fallback)
                .await
                .context("failed to load data")?;
            // 使用缓存或回退数据启动时，先检查一次更新
            let outcome = store.refresh().await;
            info!("{}", outcome);
            Arc::new(store)
        }
    };
    let parser = UserAgentStringParser::new(store);
    info!("规则库版本：{}", parser.data_version());

    let print = |user_agent: &str| -> anyhow::Result<()> {
        let result = parser.parse(user_agent);
        let json = if args.compact {
            serde_json::to_string(&result)?
        } else {
            serde_json::to_string_pretty(&result)?
        };
        println!("{}", json);
        Ok(())
    };

    if args.user_agents.is_empty() {
        for line in std::io::stdin().lock().lines() {
            let line = line?;
            if !line.trim().is_empty() {
                print(line.trim())?;
            }
        }
    } else {
        for user_agent in &args.user_agents {
            print(user_agent)?;
        }
    }
    Ok(())
}
