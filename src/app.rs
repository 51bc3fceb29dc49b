use std::sync::Arc;

use tracing::info;

use crate::clients::{SendGridClient, SheetsClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::services::notifier::{LogMailer, Mailer, Notifier};
use crate::services::submission_store::{SheetBackend, SubmissionStore};
use crate::services::MemorySheet;
use crate::utils::log_startup;
use crate::web::{self, AppState};
use crate::workflow::{FormController, SessionRegistry};

/// 应用主结构
pub struct App {
    config: Config,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> AppResult<Self> {
        config.validate()?;
        log_startup(&config);
        Ok(Self { config })
    }

    /// 运行应用主逻辑：按配置装配存储和邮件渠道，然后启动 HTTP 服务
    pub async fn run(self) -> AppResult<()> {
        let config = &self.config;
        let tz = config.tz()?;

        if config.dry_run {
            let store = SubmissionStore::new(MemorySheet::new(), &config.worksheet_title);
            let notifier = Notifier::new(LogMailer, config.sender());
            serve(config, FormController::new(store, notifier, tz)).await
        } else {
            let store = SubmissionStore::new(SheetsClient::new(config)?, &config.worksheet_title);
            let notifier = Notifier::new(SendGridClient::new(config)?, config.sender());
            serve(config, FormController::new(store, notifier, tz)).await
        }
    }
}

async fn serve<B, M>(config: &Config, controller: FormController<B, M>) -> AppResult<()>
where
    B: SheetBackend + 'static,
    M: Mailer + 'static,
{
    let state = Arc::new(AppState {
        controller,
        sessions: SessionRegistry::new(),
    });
    let router = web::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("✓ 服务已启动: http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("服务已停止");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("收到退出信号，正在停止服务...");
    }
}
