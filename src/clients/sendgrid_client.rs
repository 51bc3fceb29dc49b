//! SendGrid 邮件 API 客户端
//!
//! 封装 v3 `mail/send` 调用，作为确认邮件的发送渠道

use reqwest::Url;
use serde_json::{json, Value};
use tracing::debug;

use crate::clients::sheets_client::join;
use crate::config::{Config, Secret};
use crate::error::{notify_error, AppError, ConfigError, NotifyError};
use crate::services::notifier::{EmailMessage, Mailer};

/// SendGrid 客户端
pub struct SendGridClient {
    http: reqwest::Client,
    endpoint: Url,
    api_key: Secret,
}

impl SendGridClient {
    /// 创建新的 SendGrid 客户端
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config.sendgrid_api_key.clone().ok_or(ConfigError::Missing {
            name: "SENDGRID_API_KEY",
        })?;
        let base = Url::parse(&config.sendgrid_api_base_url).map_err(|_| {
            ConfigError::InvalidValue {
                name: "sendgrid_api_base_url",
                value: config.sendgrid_api_base_url.clone(),
                expected: "URL",
            }
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            http,
            endpoint: join(&base, &["v3", "mail", "send"]),
            api_key,
        })
    }

    /// 构建请求体
    pub fn payload(message: &EmailMessage) -> Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/html", "value": message.html_body }]
        })
    }
}

impl Mailer for SendGridClient {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        debug!("调用 SendGrid API: {}", self.endpoint);

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.expose())
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(notify_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
