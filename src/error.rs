//! 错误类型
//!
//! 按阶段划分：校验（可恢复、展示给用户）、存储（提交未记录）、通知（提交已记录）、配置（启动失败）

use thiserror::Error;

/// 表单校验错误
///
/// `Display` 即为展示给用户的提示文本
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// 必填字段为空
    #[error("{label} is required.")]
    EmptyField {
        field: &'static str,
        label: &'static str,
    },
    /// 邮箱为空或格式不合法
    #[error("A valid Email Address is required.")]
    InvalidEmail,
    /// 数值不是整数或超出范围
    #[error("Enter a number between {min} and {max} for cars finishing on the lead lap.")]
    OutOfRange {
        field: &'static str,
        min: u32,
        max: u32,
    },
    /// 选项缺失或不在候选列表中
    #[error("Please pick a {label}.")]
    InvalidChoice {
        field: &'static str,
        label: &'static str,
    },
}

impl ValidationError {
    /// 出错的表单字段名
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptyField { field, .. }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidChoice { field, .. } => field,
            ValidationError::InvalidEmail => "email",
        }
    }
}

/// 表格存储错误（提交未被记录）
#[derive(Debug, Error)]
pub enum StoreError {
    /// 网络请求失败
    #[error("表格服务请求失败 ({operation}): {source}")]
    Unavailable {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },
    /// 请求超时
    #[error("表格服务请求超时 ({operation})")]
    Timeout { operation: &'static str },
    /// 服务返回非成功状态码（包括鉴权失败）
    #[error("表格服务返回错误 ({operation}): status={status}, body={body}")]
    Rejected {
        operation: &'static str,
        status: u16,
        body: String,
    },
    /// 响应无法解析
    #[error("表格服务响应无法解析 ({operation}): {message}")]
    BadResponse {
        operation: &'static str,
        message: String,
    },
    /// 按名称找不到表格文档
    #[error("找不到表格文档: {name}")]
    SpreadsheetNotFound { name: String },
    /// 访问凭证不可用
    #[error("无法读取访问凭证: {0}")]
    Credential(String),
}

/// 确认邮件发送错误（提交已被记录）
#[derive(Debug, Error)]
pub enum NotifyError {
    /// 网络请求失败
    #[error("邮件服务请求失败: {0}")]
    Unavailable(#[source] reqwest::Error),
    /// 请求超时
    #[error("邮件服务请求超时")]
    Timeout,
    /// 服务返回非成功状态码
    #[error("邮件服务返回错误: status={status}, body={body}")]
    Rejected { status: u16, body: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必需的配置项缺失
    #[error("缺少配置项 {name}")]
    Missing { name: &'static str },
    /// 配置值无法解析
    #[error("配置项 {name} 解析失败: 值 '{value}' 无法转换为 {expected}")]
    InvalidValue {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    /// 读取配置文件失败
    #[error("读取配置文件失败 ({path}): {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 应用程序错误
#[derive(Debug, Error)]
pub enum AppError {
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    #[error("HTTP 客户端初始化失败: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("服务启动失败: {0}")]
    Server(#[from] std::io::Error),
}

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 按 reqwest 错误种类区分超时与其它网络错误
pub(crate) fn store_error(operation: &'static str, err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout { operation }
    } else {
        StoreError::Unavailable {
            operation,
            source: err,
        }
    }
}

pub(crate) fn notify_error(err: reqwest::Error) -> NotifyError {
    if err.is_timeout() {
        NotifyError::Timeout
    } else {
        NotifyError::Unavailable(err)
    }
}
