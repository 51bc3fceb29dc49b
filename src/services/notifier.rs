//! 确认邮件服务 - 业务能力层
//!
//! 只负责"按固定模板给参赛者发确认邮件"能力。
//! 发送失败不回滚已写入的记录，由调用方记录日志

use std::future::Future;

use tracing::{debug, info};

use crate::error::NotifyError;
use crate::models::SubmissionRecord;
use crate::utils::html::escape_html;

/// 固定邮件标题
pub const CONFIRMATION_SUBJECT: &str = "✅ Cup Car Challenge – Confirmation Received";

/// 待发送的邮件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// 邮件发送渠道
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// 确认邮件服务
pub struct Notifier<M> {
    mailer: M,
    sender: String,
}

impl<M: Mailer> Notifier<M> {
    /// 创建新的确认邮件服务
    pub fn new(mailer: M, sender: impl Into<String>) -> Self {
        Self {
            mailer,
            sender: sender.into(),
        }
    }

    pub fn mailer(&self) -> &M {
        &self.mailer
    }

    /// 发送确认邮件
    pub async fn send_confirmation(
        &self,
        to_address: &str,
        record: &SubmissionRecord,
    ) -> Result<(), NotifyError> {
        let message = self.build_message(to_address, record);
        debug!("发送确认邮件: {} -> {}", message.from, message.to);
        self.mailer.send(&message).await?;
        info!("📧 确认邮件已发送: {}", to_address);
        Ok(())
    }

    /// 按模板生成邮件
    pub fn build_message(&self, to_address: &str, record: &SubmissionRecord) -> EmailMessage {
        EmailMessage {
            from: self.sender.clone(),
            to: to_address.to_string(),
            subject: CONFIRMATION_SUBJECT.to_string(),
            html_body: confirmation_body(record),
        }
    }
}

fn confirmation_body(record: &SubmissionRecord) -> String {
    let s = &record.submission;
    format!(
        r#"<p>Hi {name},</p>
<p>Thanks for participating in the Cup Car Challenge!</p>
<ul>
    <li><strong>Chevrolet Driver:</strong> {chevrolet}</li>
    <li><strong>Ford Driver:</strong> {ford}</li>
    <li><strong>Toyota Driver:</strong> {toyota}</li>
    <li><strong>Manufacturer Winner:</strong> {manufacturer}</li>
    <li><strong>Cars on Lead Lap:</strong> {lead_lap}</li>
</ul>
<p>🏁 Good luck and may the best team win!</p>
"#,
        name = escape_html(&s.entry_name),
        chevrolet = escape_html(&s.chevrolet_driver),
        ford = escape_html(&s.ford_driver),
        toyota = escape_html(&s.toyota_driver),
        manufacturer = s.manufacturer,
        lead_lap = s.lead_lap,
    )
}

/// 只写日志不发送的邮件渠道（dry_run 模式）
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        info!(
            "📧 [dry-run] 邮件未实际发送: to={} subject={}",
            message.to, message.subject
        );
        debug!("[dry-run] 邮件正文:\n{}", message.html_body);
        Ok(())
    }
}
