//! 提交存储 - 业务能力层
//!
//! 只负责"把一条记录追加到表格"能力：
//! 1. 按标题查找工作表，不存在则创建
//! 2. 确保第一行是表头（只改第一行）
//! 3. 追加一行数据（唯一的数据写入路径，不去重）
//!
//! 具体的表格服务通过 [`SheetBackend`] 注入

use std::future::Future;

use tracing::{debug, info};

use crate::error::StoreError;
use crate::models::{CellValue, SubmissionRecord, SHEET_HEADERS};

/// 新建工作表的行数
pub const SHEET_ROWS: u32 = 100;
/// 新建工作表的列数
pub const SHEET_COLS: u32 = 10;

/// 工作表句柄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetHandle {
    pub sheet_id: i64,
    pub title: String,
}

/// 表头检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStatus {
    /// 表头已存在且一致
    Unchanged,
    /// 表头缺失或不一致，已覆盖
    Rewritten,
}

/// 表格服务的基本操作
pub trait SheetBackend: Send + Sync {
    /// 列出文档中的全部工作表
    fn list_sheets(&self) -> impl Future<Output = Result<Vec<SheetHandle>, StoreError>> + Send;

    /// 新建工作表
    fn add_sheet(
        &self,
        title: &str,
        rows: u32,
        cols: u32,
    ) -> impl Future<Output = Result<SheetHandle, StoreError>> + Send;

    /// 读取第一行，工作表为空时返回空列表
    fn read_first_row(
        &self,
        sheet: &SheetHandle,
    ) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;

    /// 用 `headers` 替换第一行
    fn write_header(
        &self,
        sheet: &SheetHandle,
        headers: &[&str],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 给第一行的前 `columns` 列设置表头样式
    fn style_header(
        &self,
        sheet: &SheetHandle,
        columns: usize,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// 在末尾追加一行
    fn append_row(
        &self,
        sheet: &SheetHandle,
        row: &[CellValue],
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// 提交存储客户端
pub struct SubmissionStore<B> {
    backend: B,
    worksheet_title: String,
}

impl<B: SheetBackend> SubmissionStore<B> {
    /// 创建新的存储客户端
    pub fn new(backend: B, worksheet_title: impl Into<String>) -> Self {
        Self {
            backend,
            worksheet_title: worksheet_title.into(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn worksheet_title(&self) -> &str {
        &self.worksheet_title
    }

    /// 查找工作表（忽略大小写和首尾空白），不存在则创建
    pub async fn ensure_sheet(&self, name: &str) -> Result<SheetHandle, StoreError> {
        let wanted = normalize_title(name);

        let sheets = self.backend.list_sheets().await?;
        if let Some(sheet) = sheets
            .into_iter()
            .find(|s| normalize_title(&s.title) == wanted)
        {
            debug!("找到工作表: {} (id={})", sheet.title, sheet.sheet_id);
            return Ok(sheet);
        }

        info!("📄 工作表 {} 不存在，正在创建...", name.trim());
        let sheet = self
            .backend
            .add_sheet(name.trim(), SHEET_ROWS, SHEET_COLS)
            .await?;
        info!("✓ 工作表创建成功 (id={})", sheet.sheet_id);

        Ok(sheet)
    }

    /// 确保第一行与 `expected` 完全一致（有序比较）
    ///
    /// 列相同但顺序不同也视为不一致
    pub async fn ensure_header(
        &self,
        sheet: &SheetHandle,
        expected: &[&str],
    ) -> Result<HeaderStatus, StoreError> {
        let current = self.backend.read_first_row(sheet).await?;

        if current.iter().map(String::as_str).eq(expected.iter().copied()) {
            return Ok(HeaderStatus::Unchanged);
        }

        if current.is_empty() {
            info!("📝 工作表 {} 没有表头，正在写入", sheet.title);
        } else {
            info!(
                "📝 工作表 {} 表头不一致，正在覆盖: {:?}",
                sheet.title, current
            );
        }

        self.backend.write_header(sheet, expected).await?;
        self.backend.style_header(sheet, expected.len()).await?;

        Ok(HeaderStatus::Rewritten)
    }

    /// 追加一条记录
    pub async fn append_record(
        &self,
        sheet: &SheetHandle,
        record: &SubmissionRecord,
    ) -> Result<(), StoreError> {
        let row = record.to_row();
        self.backend.append_row(sheet, &row).await?;
        debug!("已追加记录到 {}: {}", sheet.title, record.submission.email);
        Ok(())
    }

    /// 完整的写入流程：工作表 → 表头 → 追加
    pub async fn record_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        let sheet = self.ensure_sheet(&self.worksheet_title).await?;
        self.ensure_header(&sheet, &SHEET_HEADERS).await?;
        self.append_record(&sheet, record).await
    }
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}
