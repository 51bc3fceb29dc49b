//! HTTP 路由处理

use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{Html, IntoResponse, Response},
    Form, Json,
};
use serde::Serialize;
use tracing::{debug, error, info};

use crate::models::SurveyForm;
use crate::services::notifier::Mailer;
use crate::services::submission_store::SheetBackend;
use crate::web::render;
use crate::workflow::{FormController, SessionId, SessionRegistry, SessionState, SubmitOutcome};

/// 会话 cookie 名称
pub const SESSION_COOKIE: &str = "survey_session";

/// 路由共享状态
pub struct AppState<B, M> {
    pub controller: FormController<B, M>,
    pub sessions: SessionRegistry,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// 健康检查
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// 显示表单；已提交的会话显示确认页
pub async fn show_form<B, M>(
    State(state): State<Arc<AppState<B, M>>>,
    headers: HeaderMap,
) -> Response
where
    B: SheetBackend + 'static,
    M: Mailer + 'static,
{
    let (session, is_new) = resolve_session(&headers);

    let body = match state.sessions.state(&session).await {
        SessionState::Submitted => render::already_submitted_page(),
        _ => render::form_page(&SurveyForm::default(), &[], None),
    };

    with_session_cookie((StatusCode::OK, Html(body)).into_response(), &session, is_new)
}

/// 处理表单提交
pub async fn submit_form<B, M>(
    State(state): State<Arc<AppState<B, M>>>,
    headers: HeaderMap,
    Form(form): Form<SurveyForm>,
) -> Response
where
    B: SheetBackend + 'static,
    M: Mailer + 'static,
{
    let (session, is_new) = resolve_session(&headers);
    debug!("[会话 {}] 收到提交", session);

    // 在独立任务中完成提交：客户端断开时请求 future 被丢弃，任务仍会执行到 finish
    let task = tokio::spawn(submit_in_session(state.clone(), session.clone(), form));
    let (status, body) = match task.await {
        Ok(rendered) => rendered,
        Err(e) => {
            error!("❌ [会话 {}] 提交任务异常退出: {}", session, e);
            if state.sessions.state(&session).await == SessionState::Submitting {
                state.sessions.finish(&session, SessionState::NotSubmitted).await;
            }
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                render::form_page(
                    &SurveyForm::default(),
                    &[],
                    Some(render::STORE_FAILED_MESSAGE),
                ),
            )
        }
    };

    with_session_cookie((status, Html(body)).into_response(), &session, is_new)
}

async fn submit_in_session<B, M>(
    state: Arc<AppState<B, M>>,
    session: SessionId,
    form: SurveyForm,
) -> (StatusCode, String)
where
    B: SheetBackend + 'static,
    M: Mailer + 'static,
{
    match state.sessions.begin(&session).await {
        Err(SessionState::Submitting) => {
            info!("[会话 {}] 上一次提交仍在处理", session);
            (StatusCode::CONFLICT, render::in_progress_page())
        }
        Err(_) => (StatusCode::OK, render::already_submitted_page()),
        Ok(prior) => {
            let (next, outcome) = state.controller.submit(prior, &form).await;
            state.sessions.finish(&session, next).await;
            debug!("[会话 {}] 状态: {:?} -> {:?}", session, prior, next);
            render_outcome(&form, outcome)
        }
    }
}

fn render_outcome(form: &SurveyForm, outcome: SubmitOutcome) -> (StatusCode, String) {
    match outcome {
        SubmitOutcome::Recorded { notify_error, .. } => {
            (StatusCode::OK, render::success_page(notify_error.is_none()))
        }
        SubmitOutcome::Rejected(errors) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            render::form_page(form, &errors, None),
        ),
        SubmitOutcome::StoreFailed(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            render::form_page(form, &[], Some(render::STORE_FAILED_MESSAGE)),
        ),
        SubmitOutcome::AlreadySubmitted => (StatusCode::OK, render::already_submitted_page()),
        SubmitOutcome::InProgress => (StatusCode::CONFLICT, render::in_progress_page()),
    }
}

/// 从 cookie 中取会话 ID，没有或不合法时生成新的
fn resolve_session(headers: &HeaderMap) -> (SessionId, bool) {
    match session_from_headers(headers) {
        Some(id) => (id, false),
        None => (SessionId::generate(), true),
    }
}

pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .and_then(|(_, value)| SessionId::parse(value))
}

fn with_session_cookie(mut response: Response, session: &SessionId, is_new: bool) -> Response {
    if is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            SESSION_COOKIE,
            session.as_str()
        );
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().insert(SET_COOKIE, value);
        }
    }
    response
}
