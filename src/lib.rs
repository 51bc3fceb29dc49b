//! # Cup Survey
//!
//! Cup Car Challenge 赛前预测问卷服务：收集表单、校验、写入共享表格、发送确认邮件
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 外部客户端层（Clients）
//! - `clients/` - 只负责与外部 API 通信
//! - `SheetsClient` - Google Sheets / Drive REST 接口
//! - `SendGridClient` - SendGrid 邮件接口
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条提交
//! - `validator` - 表单校验（纯函数）
//! - `SubmissionStore` - 工作表查找、表头维护、追加记录
//! - `Notifier` - 确认邮件
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一次提交"的完整处理流程
//! - `SessionState` - 会话状态（显式传入/传出）
//! - `FormController` - 流程编排（validate → store → notify）
//!
//! ### ④ 接入层（Web）
//! - `web/` - axum 路由、会话 cookie、页面渲染
//! - `App` - 按配置装配依赖并启动服务

pub mod app;
pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod services;
pub mod utils;
pub mod web;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult, NotifyError, StoreError, ValidationError};
pub use models::{SubmissionRecord, SurveyForm, ValidSubmission};
pub use services::{validate, MemorySheet, Notifier, SubmissionStore};
pub use workflow::{FormController, SessionState, SubmitOutcome};
