//! 表单提交流程 - 流程层
//!
//! 核心职责：定义"一次提交"的完整处理流程
//!
//! 流程顺序：
//! 1. 已提交的会话直接返回
//! 2. 校验（失败则无任何副作用）
//! 3. 写入表格（失败则不发邮件，允许重试）
//! 4. 发送确认邮件（失败只记录日志，提交仍然有效）

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::{error, info, warn};

use crate::error::{NotifyError, StoreError, ValidationError};
use crate::models::{SubmissionRecord, SurveyForm};
use crate::services::notifier::{Mailer, Notifier};
use crate::services::submission_store::{SheetBackend, SubmissionStore};
use crate::services::validator;
use crate::utils::truncate_text;
use crate::workflow::session::SessionState;

/// 一次提交的结果
#[derive(Debug)]
pub enum SubmitOutcome {
    /// 已写入表格；邮件发送失败时带上错误
    Recorded {
        email: String,
        notify_error: Option<NotifyError>,
    },
    /// 校验失败
    Rejected(Vec<ValidationError>),
    /// 写入表格失败，提交未被记录
    StoreFailed(StoreError),
    /// 该会话已经提交过
    AlreadySubmitted,
    /// 该会话的另一次提交正在处理
    InProgress,
}

/// 表单提交流程
///
/// - 不持有会话状态，状态由调用方传入并接收返回值
/// - 只依赖业务能力（services）
pub struct FormController<B, M> {
    store: SubmissionStore<B>,
    notifier: Notifier<M>,
    tz: Tz,
    clock: fn() -> DateTime<Utc>,
}

impl<B: SheetBackend, M: Mailer> FormController<B, M> {
    /// 创建新的表单提交流程
    pub fn new(store: SubmissionStore<B>, notifier: Notifier<M>, tz: Tz) -> Self {
        Self {
            store,
            notifier,
            tz,
            clock: Utc::now,
        }
    }

    /// 替换时间来源
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &SubmissionStore<B> {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier<M> {
        &self.notifier
    }

    /// 处理一次提交，返回新的会话状态和结果
    pub async fn submit(
        &self,
        state: SessionState,
        form: &SurveyForm,
    ) -> (SessionState, SubmitOutcome) {
        match state {
            SessionState::Submitted => {
                info!("会话已提交过，忽略本次提交");
                return (SessionState::Submitted, SubmitOutcome::AlreadySubmitted);
            }
            SessionState::Submitting => {
                return (SessionState::Submitting, SubmitOutcome::InProgress);
            }
            SessionState::NotSubmitted | SessionState::Rejected => {}
        }

        // ========== 校验 ==========
        let submission = match validator::validate(form) {
            Ok(submission) => submission,
            Err(errors) => {
                info!("⚠️ 表单校验未通过: {} 个错误", errors.len());
                return (SessionState::Rejected, SubmitOutcome::Rejected(errors));
            }
        };

        let record = SubmissionRecord::new(submission, (self.clock)().with_timezone(&self.tz));

        // ========== 写入表格 ==========
        if let Err(e) = self.store.record_submission(&record).await {
            error!(
                "❌ 写入表格失败，提交未记录 ({}): {}",
                record.submission.email, e
            );
            return (SessionState::NotSubmitted, SubmitOutcome::StoreFailed(e));
        }
        info!(
            "✓ 提交已记录: {} <{}>",
            truncate_text(&record.submission.entry_name, 40),
            record.submission.email
        );

        // ========== 发送确认邮件 ==========
        let notify_error = match self
            .notifier
            .send_confirmation(&record.submission.email, &record)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "⚠️ 确认邮件发送失败，提交已记录 ({}): {}",
                    record.submission.email, e
                );
                Some(e)
            }
        };

        (
            SessionState::Submitted,
            SubmitOutcome::Recorded {
                email: record.submission.email,
                notify_error,
            },
        )
    }
}
