use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件（存在时读取）
pub const DEFAULT_CONFIG_FILE: &str = "survey.toml";

/// 敏感配置值，`Debug` 输出时隐藏
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// 程序配置
///
/// 读取顺序：默认值 → TOML 配置文件 → 环境变量。密钥没有默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub bind_addr: String,
    /// 演练模式：使用内存表格并只在日志中输出邮件
    pub dry_run: bool,
    // --- 表格配置 ---
    /// 表格文档名称（未配置 ID 时按名称查找）
    pub spreadsheet_name: String,
    pub spreadsheet_id: Option<String>,
    /// 工作表标题
    pub worksheet_title: String,
    /// 时间戳使用的时区
    pub timezone: String,
    pub sheets_api_base_url: String,
    pub drive_api_base_url: String,
    /// 访问令牌（与令牌文件二选一，文件每次请求时重新读取）
    pub google_access_token: Option<Secret>,
    pub google_access_token_file: Option<String>,
    // --- 邮件配置 ---
    pub sendgrid_api_key: Option<Secret>,
    pub sendgrid_api_base_url: String,
    /// 发件人地址
    pub sender_address: Option<String>,
    // --- 其它 ---
    /// 外部请求超时（秒）
    pub request_timeout_secs: u64,
    /// 未设置 RUST_LOG 时使用的日志过滤规则
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            dry_run: false,
            spreadsheet_name: "Cup Survey".to_string(),
            spreadsheet_id: None,
            worksheet_title: "Chicago 2025".to_string(),
            timezone: "US/Eastern".to_string(),
            sheets_api_base_url: "https://sheets.googleapis.com".to_string(),
            drive_api_base_url: "https://www.googleapis.com".to_string(),
            google_access_token: None,
            google_access_token_file: None,
            sendgrid_api_key: None,
            sendgrid_api_base_url: "https://api.sendgrid.com".to_string(),
            sender_address: None,
            request_timeout_secs: 10,
            log_filter: "cup_survey=info,tower_http=info".to_string(),
        }
    }
}

impl Config {
    /// 从配置文件和环境变量加载并校验
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("SURVEY_CONFIG") {
            Ok(path) => Self::from_file(&path)?,
            Err(_) if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// 读取 TOML 配置文件，未出现的字段使用默认值
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_string(),
            source,
        })?;
        Self::from_toml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 用环境变量覆盖配置
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(v) = var("SURVEY_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = var("SURVEY_DRY_RUN") {
            self.dry_run = parse_value("SURVEY_DRY_RUN", &v, "bool")?;
        }
        if let Some(v) = var("SURVEY_SPREADSHEET_NAME") {
            self.spreadsheet_name = v;
        }
        if let Some(v) = var("SURVEY_SPREADSHEET_ID") {
            self.spreadsheet_id = Some(v);
        }
        if let Some(v) = var("SURVEY_WORKSHEET") {
            self.worksheet_title = v;
        }
        if let Some(v) = var("SURVEY_TIMEZONE") {
            self.timezone = v;
        }
        if let Some(v) = var("SURVEY_REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs =
                parse_value("SURVEY_REQUEST_TIMEOUT_SECS", &v, "integer")?;
        }
        if let Some(v) = var("SURVEY_LOG_FILTER") {
            self.log_filter = v;
        }
        if let Some(v) = var("GOOGLE_ACCESS_TOKEN") {
            self.google_access_token = Some(Secret::new(v));
        }
        if let Some(v) = var("GOOGLE_ACCESS_TOKEN_FILE") {
            self.google_access_token_file = Some(v);
        }
        if let Some(v) = var("SHEETS_API_BASE_URL") {
            self.sheets_api_base_url = v;
        }
        if let Some(v) = var("DRIVE_API_BASE_URL") {
            self.drive_api_base_url = v;
        }
        if let Some(v) = var("SENDGRID_API_KEY") {
            self.sendgrid_api_key = Some(Secret::new(v));
        }
        if let Some(v) = var("SENDGRID_API_BASE_URL") {
            self.sendgrid_api_base_url = v;
        }
        if let Some(v) = var("SENDER_ADDRESS") {
            self.sender_address = Some(v);
        }

        Ok(())
    }

    /// 校验配置；非演练模式下要求提供全部凭证
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.tz()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                name: "request_timeout_secs",
                value: "0".to_string(),
                expected: "positive integer",
            });
        }

        if self.dry_run {
            return Ok(());
        }

        if self.google_access_token.is_none() && self.google_access_token_file.is_none() {
            return Err(ConfigError::Missing {
                name: "GOOGLE_ACCESS_TOKEN or GOOGLE_ACCESS_TOKEN_FILE",
            });
        }
        if self.sendgrid_api_key.is_none() {
            return Err(ConfigError::Missing {
                name: "SENDGRID_API_KEY",
            });
        }
        if self.sender_address.is_none() {
            return Err(ConfigError::Missing {
                name: "SENDER_ADDRESS",
            });
        }

        Ok(())
    }

    /// 解析时区
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::InvalidValue {
                name: "timezone",
                value: self.timezone.clone(),
                expected: "IANA timezone",
            })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// 发件人地址（演练模式下允许缺省）
    pub fn sender(&self) -> &str {
        self.sender_address.as_deref().unwrap_or("noreply@localhost")
    }
}

fn parse_value<T: FromStr>(
    name: &'static str,
    value: &str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            name,
            value: value.to_string(),
            expected,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_require_credentials() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Missing { .. })
        ));
        assert_eq!(config.tz().unwrap(), chrono_tz::US::Eastern);
    }

    #[test]
    fn test_dry_run_needs_no_credentials() {
        let mut config = Config::default();
        config
            .apply_env(|k| env(&[("SURVEY_DRY_RUN", "true")]).get(k).cloned())
            .unwrap();
        assert!(config.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[
            ("GOOGLE_ACCESS_TOKEN", "ya29.token"),
            ("SENDGRID_API_KEY", "SG.key"),
            ("SENDER_ADDRESS", "races@example.com"),
            ("SURVEY_WORKSHEET", "Daytona 2026"),
            ("SURVEY_REQUEST_TIMEOUT_SECS", "5"),
        ]);
        let mut config = Config::default();
        config.apply_env(|k| vars.get(k).cloned()).unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.worksheet_title, "Daytona 2026");
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
        assert_eq!(
            config.google_access_token.as_ref().map(Secret::expose),
            Some("ya29.token")
        );
        assert!(!format!("{:?}", config).contains("SG.key"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| env(&[("SURVEY_DRY_RUN", "maybe")]).get(k).cloned())
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                name: "SURVEY_DRY_RUN",
                ..
            }
        ));

        let mut config = Config::default();
        config.dry_run = true;
        config.timezone = "Mars/Olympus".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_file_fills_missing_fields_with_defaults() {
        let config = Config::from_toml_str(
            r#"
            dry_run = true
            worksheet_title = "Chicago 2025"
            sender_address = "races@example.com"
            "#,
        )
        .unwrap();

        assert!(config.dry_run);
        assert_eq!(config.spreadsheet_name, "Cup Survey");
        assert_eq!(config.sender(), "races@example.com");
        assert_eq!(config.request_timeout_secs, 10);
    }
}
