use crate::error::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

/// 环境变量前缀, 例如 INVOICE_ENGINE__SERVER__PORT=9000
const ENV_PREFIX: &str = "INVOICE_ENGINE";
/// 可选配置文件路径
const CONFIG_FILE_VAR: &str = "INVOICE_ENGINE_CONFIG";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub rates: RatesConfig,
    pub currency: CurrencyConfig,
    pub colors: ColorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// 汇率源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatesConfig {
    /// 汇率接口地址, 实际请求为 `{api_url}/{base}`
    pub api_url: String,
    pub base_currency: String,
    pub timeout_secs: u64,
}

/// 展示币种配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// 用户偏好的展示币种
    pub display_currency: String,
    /// 金额未标注币种时的默认来源币种
    pub default_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorsConfig {
    /// 远程 Logo 下载与解码的总超时
    pub image_timeout_secs: u64,
    /// 远程 Logo 最大字节数
    pub max_image_bytes: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            rates: RatesConfig {
                api_url: "https://open.er-api.com/v6/latest".to_string(),
                base_currency: "EUR".to_string(),
                timeout_secs: 10,
            },
            currency: CurrencyConfig {
                display_currency: "XOF".to_string(),
                default_currency: "XOF".to_string(),
            },
            colors: ColorsConfig {
                image_timeout_secs: 10,
                max_image_bytes: 5 * 1024 * 1024,
            },
        }
    }
}

impl AppConfig {
    /// 按 默认值 -> 配置文件 -> 环境变量 的顺序加载
    pub fn load() -> Result<Self> {
        let defaults = Config::try_from(&AppConfig::default())?;
        let mut builder = Config::builder().add_source(defaults);

        if let Ok(path) = std::env::var(CONFIG_FILE_VAR) {
            builder = builder.add_source(File::with_name(&path).required(false));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// 从环境变量加载配置, 失败时回退默认值
    pub fn from_env() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }
}
