//! Google Sheets API 客户端
//!
//! 通过 Sheets v4 / Drive v3 REST 接口实现 [`SheetBackend`]。
//! 所有写入使用 `valueInputOption=RAW`，用户输入不会被当作公式解析

use std::path::PathBuf;

use reqwest::{RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{Config, Secret};
use crate::error::{store_error, AppError, ConfigError, StoreError};
use crate::models::CellValue;
use crate::services::submission_store::{SheetBackend, SheetHandle};

const SPREADSHEET_MIME_TYPE: &str = "application/vnd.google-apps.spreadsheet";

/// 访问令牌来源
#[derive(Debug, Clone)]
pub enum AccessToken {
    /// 固定令牌
    Static(Secret),
    /// 令牌文件，每次请求时重新读取（由外部进程负责刷新）
    File(PathBuf),
}

impl AccessToken {
    pub fn from_config(config: &Config) -> Option<Self> {
        match (&config.google_access_token, &config.google_access_token_file) {
            (Some(token), _) => Some(AccessToken::Static(token.clone())),
            (None, Some(path)) => Some(AccessToken::File(PathBuf::from(path))),
            (None, None) => None,
        }
    }

    async fn resolve(&self) -> Result<String, StoreError> {
        match self {
            AccessToken::Static(token) => Ok(token.expose().to_string()),
            AccessToken::File(path) => {
                let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                    StoreError::Credential(format!("{}: {}", path.display(), e))
                })?;
                let token = content.trim();
                if token.is_empty() {
                    return Err(StoreError::Credential(format!(
                        "{}: 令牌文件为空",
                        path.display()
                    )));
                }
                Ok(token.to_string())
            }
        }
    }
}

/// Google Sheets 客户端
pub struct SheetsClient {
    http: reqwest::Client,
    sheets_base: Url,
    drive_base: Url,
    spreadsheet_name: String,
    spreadsheet_id: OnceCell<String>,
    token: AccessToken,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetInfo {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl SheetProperties {
    fn into_handle(self) -> SheetHandle {
        SheetHandle {
            sheet_id: self.sheet_id,
            title: self.title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct DriveFileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
    name: String,
}

impl SheetsClient {
    /// 创建新的表格客户端
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let token = AccessToken::from_config(config).ok_or(ConfigError::Missing {
            name: "GOOGLE_ACCESS_TOKEN or GOOGLE_ACCESS_TOKEN_FILE",
        })?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            http,
            sheets_base: parse_base("sheets_api_base_url", &config.sheets_api_base_url)?,
            drive_base: parse_base("drive_api_base_url", &config.drive_api_base_url)?,
            spreadsheet_name: config.spreadsheet_name.clone(),
            spreadsheet_id: OnceCell::new_with(config.spreadsheet_id.clone()),
            token,
        })
    }

    /// 表格文档 ID（未配置时按名称通过 Drive 查找，结果在进程内缓存）
    pub async fn spreadsheet_id(&self) -> Result<&str, StoreError> {
        self.spreadsheet_id
            .get_or_try_init(|| self.find_spreadsheet_by_name())
            .await
            .map(String::as_str)
    }

    async fn find_spreadsheet_by_name(&self) -> Result<String, StoreError> {
        info!("🔍 按名称查找表格文档: {}", self.spreadsheet_name);

        let query = format!(
            "name = '{}' and mimeType = '{}' and trashed = false",
            escape_query(&self.spreadsheet_name),
            SPREADSHEET_MIME_TYPE
        );
        let url = join(&self.drive_base, &["drive", "v3", "files"]);
        let request = self
            .http
            .get(url)
            .query(&[("q", query.as_str()), ("fields", "files(id,name)")]);

        let list: DriveFileList = self.send_json("find_spreadsheet", request).await?;
        let file = list
            .files
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::SpreadsheetNotFound {
                name: self.spreadsheet_name.clone(),
            })?;

        info!("✓ 找到表格文档: {} (id={})", file.name, file.id);
        Ok(file.id)
    }

    fn spreadsheet_url(&self, id: &str, suffix: &str) -> Url {
        join(
            &self.sheets_base,
            &["v4", "spreadsheets", &format!("{}{}", id, suffix)],
        )
    }

    fn values_url(&self, id: &str, range: &str) -> Url {
        join(&self.sheets_base, &["v4", "spreadsheets", id, "values", range])
    }

    async fn batch_update(
        &self,
        operation: &'static str,
        requests: Value,
    ) -> Result<BatchUpdateResponse, StoreError> {
        let id = self.spreadsheet_id().await?;
        let request = self
            .http
            .post(self.spreadsheet_url(id, ":batchUpdate"))
            .json(&json!({ "requests": requests }));
        self.send_json(operation, request).await
    }

    /// 附加鉴权并发送请求，非 2xx 视为失败
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, StoreError> {
        let token = self.token.resolve().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| store_error(operation, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Rejected {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, StoreError> {
        let response = self.send(operation, request).await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| store_error(operation, e))?;
        serde_json::from_slice(&body).map_err(|e| StoreError::BadResponse {
            operation,
            message: e.to_string(),
        })
    }
}

impl SheetBackend for SheetsClient {
    async fn list_sheets(&self) -> Result<Vec<SheetHandle>, StoreError> {
        let id = self.spreadsheet_id().await?;
        let request = self
            .http
            .get(self.spreadsheet_url(id, ""))
            .query(&[("fields", "sheets.properties(sheetId,title)")]);

        let info: SpreadsheetInfo = self.send_json("list_sheets", request).await?;
        Ok(info
            .sheets
            .into_iter()
            .map(|s| s.properties.into_handle())
            .collect())
    }

    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<SheetHandle, StoreError> {
        let requests = json!([{
            "addSheet": {
                "properties": {
                    "title": title,
                    "gridProperties": { "rowCount": rows, "columnCount": cols }
                }
            }
        }]);

        let response = self.batch_update("add_sheet", requests).await?;
        let properties = response
            .replies
            .into_iter()
            .next()
            .and_then(|reply| reply.get("addSheet")?.get("properties").cloned())
            .ok_or_else(|| StoreError::BadResponse {
                operation: "add_sheet",
                message: "响应中缺少 addSheet.properties".to_string(),
            })?;

        serde_json::from_value::<SheetProperties>(properties)
            .map(SheetProperties::into_handle)
            .map_err(|e| StoreError::BadResponse {
                operation: "add_sheet",
                message: e.to_string(),
            })
    }

    async fn read_first_row(&self, sheet: &SheetHandle) -> Result<Vec<String>, StoreError> {
        let id = self.spreadsheet_id().await?;
        let request = self
            .http
            .get(self.values_url(id, &a1_range(&sheet.title, "1:1")))
            .query(&[("majorDimension", "ROWS")]);

        let range: ValueRange = self.send_json("read_header", request).await?;
        Ok(range
            .values
            .into_iter()
            .next()
            .map(|row| row.iter().map(cell_text).collect())
            .unwrap_or_default())
    }

    async fn write_header(&self, sheet: &SheetHandle, headers: &[&str]) -> Result<(), StoreError> {
        let id = self.spreadsheet_id().await?;

        // 先清空第一行，避免旧表头多出的列残留
        let clear_range = format!("{}:clear", a1_range(&sheet.title, "1:1"));
        let request = self.http.post(self.values_url(id, &clear_range)).json(&json!({}));
        self.send("clear_header", request).await?;

        let request = self
            .http
            .put(self.values_url(id, &a1_range(&sheet.title, "A1")))
            .query(&[("valueInputOption", "RAW")])
            .json(&json!({ "values": [headers] }));
        self.send("write_header", request).await?;

        debug!("表头已写入: {}", sheet.title);
        Ok(())
    }

    async fn style_header(&self, sheet: &SheetHandle, columns: usize) -> Result<(), StoreError> {
        let requests = json!([{
            "repeatCell": {
                "range": {
                    "sheetId": sheet.sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": 0,
                    "endColumnIndex": columns
                },
                "cell": {
                    "userEnteredFormat": {
                        "backgroundColor": { "red": 0.27, "green": 0.27, "blue": 0.27 },
                        "textFormat": {
                            "bold": true,
                            "foregroundColor": { "red": 1.0, "green": 1.0, "blue": 1.0 }
                        }
                    }
                },
                "fields": "userEnteredFormat(backgroundColor,textFormat)"
            }
        }]);

        self.batch_update("style_header", requests).await?;
        Ok(())
    }

    async fn append_row(&self, sheet: &SheetHandle, row: &[CellValue]) -> Result<(), StoreError> {
        let id = self.spreadsheet_id().await?;
        let range = format!("{}:append", a1_range(&sheet.title, "A1"));
        let request = self
            .http
            .post(self.values_url(id, &range))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .json(&json!({ "values": [row] }));

        self.send("append", request).await?;
        Ok(())
    }
}

fn parse_base(name: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
        expected: "URL",
    })
}

/// 在基础 URL 后追加路径段（逐段百分号编码）
pub(crate) fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// A1 表示法范围，工作表标题中的单引号需要双写
pub fn a1_range(title: &str, cells: &str) -> String {
    format!("'{}'!{}", title.replace('\'', "''"), cells)
}

fn escape_query(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
