//! 内存表格
//!
//! 用于本地演练（dry_run）和测试，行为与真实表格服务一致：
//! 追加只会加在末尾，写表头只替换第一行

use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::CellValue;
use crate::services::submission_store::{SheetBackend, SheetHandle};

/// 内存中的一个工作表
#[derive(Debug, Clone)]
pub struct MemoryTab {
    pub handle: SheetHandle,
    pub rows: Vec<Vec<CellValue>>,
    pub header_styled: bool,
    /// (行数, 列数)
    pub capacity: (u32, u32),
}

#[derive(Debug, Default)]
struct MemoryState {
    next_id: i64,
    tabs: Vec<MemoryTab>,
}

/// 内存表格文档
#[derive(Debug, Default)]
pub struct MemorySheet {
    state: Mutex<MemoryState>,
}

impl MemorySheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置一个带数据的工作表
    pub fn with_tab(title: impl Into<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let tab = MemoryTab {
            handle: SheetHandle {
                sheet_id: 0,
                title: title.into(),
            },
            rows,
            header_styled: false,
            capacity: (1000, 26),
        };
        Self {
            state: Mutex::new(MemoryState {
                next_id: 1,
                tabs: vec![tab],
            }),
        }
    }

    /// 按标题（精确匹配）取工作表快照
    pub async fn tab(&self, title: &str) -> Option<MemoryTab> {
        let state = self.state.lock().await;
        state
            .tabs
            .iter()
            .find(|t| t.handle.title == title)
            .cloned()
    }

    pub async fn tab_count(&self) -> usize {
        self.state.lock().await.tabs.len()
    }
}

fn tab_mut<'a>(
    state: &'a mut MemoryState,
    sheet: &SheetHandle,
    operation: &'static str,
) -> Result<&'a mut MemoryTab, StoreError> {
    state
        .tabs
        .iter_mut()
        .find(|t| t.handle.sheet_id == sheet.sheet_id)
        .ok_or_else(|| StoreError::BadResponse {
            operation,
            message: format!("工作表不存在: {}", sheet.title),
        })
}

impl SheetBackend for MemorySheet {
    async fn list_sheets(&self) -> Result<Vec<SheetHandle>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.tabs.iter().map(|t| t.handle.clone()).collect())
    }

    async fn add_sheet(&self, title: &str, rows: u32, cols: u32) -> Result<SheetHandle, StoreError> {
        let mut state = self.state.lock().await;
        let handle = SheetHandle {
            sheet_id: state.next_id,
            title: title.to_string(),
        };
        state.next_id += 1;
        state.tabs.push(MemoryTab {
            handle: handle.clone(),
            rows: Vec::new(),
            header_styled: false,
            capacity: (rows, cols),
        });
        Ok(handle)
    }

    async fn read_first_row(&self, sheet: &SheetHandle) -> Result<Vec<String>, StoreError> {
        let mut state = self.state.lock().await;
        let tab = tab_mut(&mut state, sheet, "read_header")?;
        Ok(tab
            .rows
            .first()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .unwrap_or_default())
    }

    async fn write_header(&self, sheet: &SheetHandle, headers: &[&str]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let tab = tab_mut(&mut state, sheet, "write_header")?;
        let header: Vec<CellValue> = headers.iter().copied().map(CellValue::text).collect();
        match tab.rows.first_mut() {
            Some(first) => *first = header,
            None => tab.rows.push(header),
        }
        Ok(())
    }

    async fn style_header(&self, sheet: &SheetHandle, _columns: usize) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        tab_mut(&mut state, sheet, "style_header")?.header_styled = true;
        Ok(())
    }

    async fn append_row(&self, sheet: &SheetHandle, row: &[CellValue]) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        tab_mut(&mut state, sheet, "append")?.rows.push(row.to_vec());
        Ok(())
    }
}
