//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `QIMING__*` 覆盖（双下划线表示嵌套，如 `QIMING__LLM__API_KEY=sk-...`）。

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub retry: RetrySection,
}

/// [app] 段：应用名、数据目录
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    pub name: Option<String>,
    /// 会话 / 收藏 / 订单 JSON 文件所在目录，未设置时用 ./data
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// [llm] 段：后端、模型、凭证、各阶段超时与温度
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 目前仅支持 deepseek（OpenAI 兼容端点）
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    /// 未设置时回退到环境变量 DEEPSEEK_API_KEY
    pub api_key: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
    #[serde(default)]
    pub temperature: LlmTemperatureSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            api_key: None,
            timeouts: LlmTimeoutsSection::default(),
            temperature: LlmTemperatureSection::default(),
        }
    }
}

fn default_provider() -> String {
    "deepseek".to_string()
}

fn default_model() -> String {
    "deepseek-chat".to_string()
}

/// [llm.timeouts] 段：单次请求超时（秒）
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_bazi_timeout")]
    pub bazi: u64,
    #[serde(default = "default_names_timeout")]
    pub names: u64,
    #[serde(default = "default_detail_timeout")]
    pub detail: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            bazi: default_bazi_timeout(),
            names: default_names_timeout(),
            detail: default_detail_timeout(),
        }
    }
}

fn default_bazi_timeout() -> u64 {
    30
}

fn default_names_timeout() -> u64 {
    45
}

fn default_detail_timeout() -> u64 {
    30
}

/// [llm.temperature] 段：取名阶段温度略高，鼓励多样性
#[derive(Debug, Clone, Deserialize)]
pub struct LlmTemperatureSection {
    #[serde(default = "default_analysis_temperature")]
    pub bazi: f32,
    #[serde(default = "default_names_temperature")]
    pub names: f32,
    #[serde(default = "default_analysis_temperature")]
    pub detail: f32,
}

impl Default for LlmTemperatureSection {
    fn default() -> Self {
        Self {
            bazi: default_analysis_temperature(),
            names: default_names_temperature(),
            detail: default_analysis_temperature(),
        }
    }
}

fn default_analysis_temperature() -> f32 {
    0.7
}

fn default_names_temperature() -> f32 {
    0.8
}

/// [retry] 段：自动重试次数与退避基数
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    /// 总尝试次数（含首次）
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl RetrySection {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_base_delay_ms() -> u64 {
    1000
}

/// 从 config 目录加载配置，环境变量 QIMING__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 QIMING__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("QIMING")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

/// 重新从磁盘与环境变量加载配置（修改 API Key 后可据此重建 LLM 客户端）
pub fn reload_config() -> Result<AppConfig, config::ConfigError> {
    load_config(None)
}
