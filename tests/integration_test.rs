use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Mutex;
use tower::ServiceExt;

use cup_survey::error::{NotifyError, StoreError};
use cup_survey::models::{CellValue, SurveyForm, SHEET_HEADERS};
use cup_survey::services::notifier::{EmailMessage, Mailer};
use cup_survey::services::submission_store::{SheetBackend, SheetHandle};
use cup_survey::services::{MemorySheet, Notifier, SubmissionStore};
use cup_survey::web::render::STORE_FAILED_MESSAGE;
use cup_survey::web::{self, AppState, SESSION_COOKIE};
use cup_survey::workflow::{
    FormController, SessionId, SessionRegistry, SessionState, SubmitOutcome,
};

const WORKSHEET: &str = "Chicago 2025";

/// 记录所有发出的邮件，可设置为发送失败
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    async fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().await.clone()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent.lock().await.push(message.clone());
        if self.fail {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "provider down".to_string(),
            });
        }
        Ok(())
    }
}

/// 所有操作都超时的表格
struct UnavailableSheet;

impl SheetBackend for UnavailableSheet {
    async fn list_sheets(&self) -> Result<Vec<SheetHandle>, StoreError> {
        Err(StoreError::Timeout {
            operation: "list_sheets",
        })
    }

    async fn add_sheet(&self, _: &str, _: u32, _: u32) -> Result<SheetHandle, StoreError> {
        Err(StoreError::Timeout {
            operation: "add_sheet",
        })
    }

    async fn read_first_row(&self, _: &SheetHandle) -> Result<Vec<String>, StoreError> {
        Err(StoreError::Timeout {
            operation: "read_header",
        })
    }

    async fn write_header(&self, _: &SheetHandle, _: &[&str]) -> Result<(), StoreError> {
        Err(StoreError::Timeout {
            operation: "write_header",
        })
    }

    async fn style_header(&self, _: &SheetHandle, _: usize) -> Result<(), StoreError> {
        Err(StoreError::Timeout {
            operation: "style_header",
        })
    }

    async fn append_row(&self, _: &SheetHandle, _: &[CellValue]) -> Result<(), StoreError> {
        Err(StoreError::Timeout {
            operation: "append",
        })
    }
}

/// 列出工作表前先等待一段时间的内存表格
struct SlowSheet {
    inner: MemorySheet,
    delay: Duration,
}

impl SheetBackend for SlowSheet {
    async fn list_sheets(&self) -> Result<Vec<SheetHandle>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_sheets().await
    }

    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<SheetHandle, StoreError> {
        self.inner.add_sheet(title, rows, cols).await
    }

    async fn read_first_row(&self, sheet: &SheetHandle) -> Result<Vec<String>, StoreError> {
        self.inner.read_first_row(sheet).await
    }

    async fn write_header(&self, sheet: &SheetHandle, headers: &[&str]) -> Result<(), StoreError> {
        self.inner.write_header(sheet, headers).await
    }

    async fn style_header(&self, sheet: &SheetHandle, columns: usize) -> Result<(), StoreError> {
        self.inner.style_header(sheet, columns).await
    }

    async fn append_row(&self, sheet: &SheetHandle, row: &[CellValue]) -> Result<(), StoreError> {
        self.inner.append_row(sheet, row).await
    }
}

fn fixed_clock() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 7, 6, 18, 0, 0).unwrap()
}

fn controller<B: SheetBackend, M: Mailer>(backend: B, mailer: M) -> FormController<B, M> {
    FormController::new(
        SubmissionStore::new(backend, WORKSHEET),
        Notifier::new(mailer, "races@example.com"),
        chrono_tz::US::Eastern,
    )
    .with_clock(fixed_clock)
}

fn jane_form() -> SurveyForm {
    SurveyForm {
        entry_name: "Jane".to_string(),
        email: "jane@x.com".to_string(),
        q1: Some("Kyle Larson".to_string()),
        q2: Some("Ryan Blaney".to_string()),
        q3: Some("Denny Hamlin".to_string()),
        q4: Some("Chevrolet".to_string()),
        lead_lap: "30".to_string(),
    }
}

async fn data_rows(controller: &FormController<MemorySheet, RecordingMailer>) -> Vec<Vec<CellValue>> {
    controller
        .store()
        .backend()
        .tab(WORKSHEET)
        .await
        .map(|tab| tab.rows.into_iter().skip(1).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_valid_submission_is_recorded_and_confirmed() {
    let controller = controller(MemorySheet::new(), RecordingMailer::default());

    let (state, outcome) = controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;

    assert_eq!(state, SessionState::Submitted);
    assert!(matches!(
        outcome,
        SubmitOutcome::Recorded {
            notify_error: None,
            ..
        }
    ));

    let tab = controller.store().backend().tab(WORKSHEET).await.unwrap();
    let header: Vec<String> = tab.rows[0].iter().map(|c| c.to_string()).collect();
    assert_eq!(header, SHEET_HEADERS);
    assert!(tab.header_styled);
    assert_eq!(
        tab.rows[1],
        vec![
            CellValue::text("2025-07-06 14:00:00"),
            CellValue::text("jane@x.com"),
            CellValue::text("Jane"),
            CellValue::text("Kyle Larson"),
            CellValue::text("Ryan Blaney"),
            CellValue::text("Denny Hamlin"),
            CellValue::text("Chevrolet"),
            CellValue::Number(30),
        ]
    );

    let sent = controller.notifier().mailer().sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, "jane@x.com");
    assert_eq!(sent[0].from, "races@example.com");
}

#[tokio::test]
async fn test_submitted_session_is_terminal() {
    let controller = controller(MemorySheet::new(), RecordingMailer::default());

    let (state, _) = controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;
    let (state, outcome) = controller.submit(state, &jane_form()).await;

    assert_eq!(state, SessionState::Submitted);
    assert!(matches!(outcome, SubmitOutcome::AlreadySubmitted));
    assert_eq!(data_rows(&controller).await.len(), 1);
    assert_eq!(controller.notifier().mailer().sent().await.len(), 1);
}

#[tokio::test]
async fn test_invalid_submission_has_no_side_effects() {
    let controller = controller(MemorySheet::new(), RecordingMailer::default());
    let form = SurveyForm {
        entry_name: " ".to_string(),
        email: "a@b".to_string(),
        lead_lap: "0".to_string(),
        ..jane_form()
    };

    let (state, outcome) = controller.submit(SessionState::NotSubmitted, &form).await;

    assert_eq!(state, SessionState::Rejected);
    match outcome {
        SubmitOutcome::Rejected(errors) => {
            let fields: Vec<&str> = errors.iter().map(|e| e.field()).collect();
            assert_eq!(fields, vec!["entry_name", "email", "lead_lap"]);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(controller.store().backend().tab_count().await, 0);
    assert!(controller.notifier().mailer().sent().await.is_empty());

    // 修正后可以重新提交
    let (state, _) = controller.submit(state, &jane_form()).await;
    assert_eq!(state, SessionState::Submitted);
}

#[tokio::test]
async fn test_store_failure_sends_no_email_and_allows_retry() {
    let controller = controller(UnavailableSheet, RecordingMailer::default());

    let (state, outcome) = controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;

    assert_eq!(state, SessionState::NotSubmitted);
    assert!(matches!(
        outcome,
        SubmitOutcome::StoreFailed(StoreError::Timeout { .. })
    ));
    assert!(controller.notifier().mailer().sent().await.is_empty());
}

#[tokio::test]
async fn test_notify_failure_still_counts_as_submitted() {
    let controller = controller(MemorySheet::new(), RecordingMailer::failing());

    let (state, outcome) = controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;

    assert_eq!(state, SessionState::Submitted);
    assert!(matches!(
        outcome,
        SubmitOutcome::Recorded {
            notify_error: Some(NotifyError::Rejected { status: 500, .. }),
            ..
        }
    ));
    assert_eq!(data_rows(&controller).await.len(), 1);
}

#[tokio::test]
async fn test_duplicate_entries_from_different_sessions_are_both_appended() {
    let controller = controller(MemorySheet::new(), RecordingMailer::default());

    controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;
    controller
        .submit(SessionState::NotSubmitted, &jane_form())
        .await;

    let tab = controller.store().backend().tab(WORKSHEET).await.unwrap();
    assert_eq!(tab.rows.len(), 3);
    assert_eq!(tab.rows[1], tab.rows[2]);
}

// ========== HTTP 路由 ==========

type TestState = AppState<MemorySheet, RecordingMailer>;

fn app_state() -> Arc<TestState> {
    Arc::new(AppState {
        controller: controller(MemorySheet::new(), RecordingMailer::default()),
        sessions: SessionRegistry::new(),
    })
}

const JANE_BODY: &str = "entry_name=Jane&email=jane%40x.com&q1=Kyle+Larson&q2=Ryan+Blaney&q3=Denny+Hamlin&q4=Chevrolet&lead_lap=30";

fn post(body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn session_cookie(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("新会话应设置 cookie")
        .to_str()
        .unwrap();
    assert!(set_cookie.starts_with(SESSION_COOKIE));
    assert!(set_cookie.contains("HttpOnly"));
    set_cookie.split(';').next().unwrap().to_string()
}

#[tokio::test]
async fn test_http_resubmission_in_same_session_is_refused() {
    let state = app_state();
    let app = web::router(state.clone());

    let first = app.clone().oneshot(post(JANE_BODY, None)).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let cookie = session_cookie(&first);
    assert!(body_text(first).await.contains("confirmation email sent"));

    let second = app
        .clone()
        .oneshot(post(JANE_BODY, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert!(second.headers().get(header::SET_COOKIE).is_none());
    assert!(body_text(second).await.contains("already submitted"));

    let page = app
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(body_text(page).await.contains("already submitted"));

    assert_eq!(data_rows(&state.controller).await.len(), 1);
    assert_eq!(state.controller.notifier().mailer().sent().await.len(), 1);
}

#[tokio::test]
async fn test_http_validation_errors_are_all_shown() {
    let state = app_state();
    let app = web::router(state.clone());

    let response = app
        .oneshot(post("entry_name=&email=abc&lead_lap=38", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Entry Name is required."));
    assert!(html.contains("A valid Email Address is required."));
    assert!(html.contains("Enter a number between 1 and 37"));
    assert!(html.contains("Please pick a Chevrolet Driver."));
    assert_eq!(state.controller.store().backend().tab_count().await, 0);
}

fn cookie_for(session: &SessionId) -> String {
    format!("{}={}", SESSION_COOKIE, session.as_str())
}

#[tokio::test]
async fn test_http_store_failure_allows_retry() {
    let state = Arc::new(AppState {
        controller: controller(UnavailableSheet, RecordingMailer::default()),
        sessions: SessionRegistry::new(),
    });
    let app = web::router(state.clone());
    let cookie = cookie_for(&SessionId::generate());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post(JANE_BODY, Some(&cookie)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let html = body_text(response).await;
        assert!(html.contains(STORE_FAILED_MESSAGE));
        // 保留用户已填写的内容
        assert!(html.contains("value=\"Jane\""));
    }

    assert!(state.sessions.is_empty().await);
    assert!(state.controller.notifier().mailer().sent().await.is_empty());
}

#[tokio::test]
async fn test_dropped_request_still_completes_submission() {
    let state = Arc::new(AppState {
        controller: controller(
            SlowSheet {
                inner: MemorySheet::new(),
                delay: Duration::from_millis(200),
            },
            RecordingMailer::default(),
        ),
        sessions: SessionRegistry::new(),
    });
    let app = web::router(state.clone());
    let session = SessionId::generate();
    let cookie = cookie_for(&session);

    // 客户端在提交完成前断开
    let dropped = tokio::time::timeout(
        Duration::from_millis(50),
        app.clone().oneshot(post(JANE_BODY, Some(&cookie))),
    )
    .await;
    assert!(dropped.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(state.sessions.state(&session).await, SessionState::Submitted);

    let retry = app
        .clone()
        .oneshot(post(JANE_BODY, Some(&cookie)))
        .await
        .unwrap();
    assert_eq!(retry.status(), StatusCode::OK);
    assert!(body_text(retry).await.contains("already submitted"));

    let tab = state
        .controller
        .store()
        .backend()
        .inner
        .tab(WORKSHEET)
        .await
        .unwrap();
    assert_eq!(tab.rows.len(), 2);
    assert_eq!(state.controller.notifier().mailer().sent().await.len(), 1);
}

#[tokio::test]
async fn test_health() {
    let app = web::router(app_state());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
}
