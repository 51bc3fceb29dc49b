//! 会话状态
//!
//! 每个浏览器会话独立维护"是否已提交"，状态对象显式传入/传出表单流程

use std::collections::HashMap;
use std::fmt::Display;

use tokio::sync::Mutex;
use uuid::Uuid;

/// 单个会话的提交状态
///
/// `NotSubmitted -> Submitting -> {Submitted, Rejected}`，
/// `Rejected` 可以再次提交，`Submitted` 为终态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    NotSubmitted,
    Submitting,
    Submitted,
    Rejected,
}

/// 会话标识（保存在 cookie 中的 UUID）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    /// 生成新的随机会话 ID
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 解析 cookie 中的值，格式不合法时返回 `None`
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim())
            .ok()
            .map(|id| Self(id.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 日志里只显示前 8 位
        write!(f, "{}", &self.0[..8.min(self.0.len())])
    }
}

/// 会话登记表
///
/// 只保存 `Submitting` 和 `Submitted` 的会话；锁不会跨越外部调用持有
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionState>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 当前状态
    pub async fn state(&self, id: &SessionId) -> SessionState {
        self.sessions
            .lock()
            .await
            .get(id)
            .copied()
            .unwrap_or_default()
    }

    /// 开始一次提交
    ///
    /// 会话空闲时切换为 `Submitting` 并返回之前的状态；
    /// 已提交或正在提交时返回 `Err(当前状态)`，不做任何修改
    pub async fn begin(&self, id: &SessionId) -> Result<SessionState, SessionState> {
        let mut sessions = self.sessions.lock().await;
        let current = sessions.get(id).copied().unwrap_or_default();
        match current {
            SessionState::Submitted | SessionState::Submitting => Err(current),
            SessionState::NotSubmitted | SessionState::Rejected => {
                sessions.insert(id.clone(), SessionState::Submitting);
                Ok(current)
            }
        }
    }

    /// 结束一次提交，保存流程返回的新状态
    pub async fn finish(&self, id: &SessionId, state: SessionState) {
        let mut sessions = self.sessions.lock().await;
        match state {
            // 与初始状态等价，不必保留
            SessionState::NotSubmitted | SessionState::Rejected => {
                sessions.remove(id);
            }
            SessionState::Submitting | SessionState::Submitted => {
                sessions.insert(id.clone(), state);
            }
        }
    }

    /// 登记的会话数量
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
