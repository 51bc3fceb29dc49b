/// 日志工具模块
///
/// 提供启动信息和日志格式化的辅助函数
use tracing::info;

use crate::config::Config;

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - Cup Car Challenge 问卷服务");
    info!("🌐 监听地址: {}", config.bind_addr);
    if config.dry_run {
        info!("🧪 演练模式: 内存表格 + 邮件只写日志");
    } else {
        info!(
            "📊 表格: {} / 工作表: {}",
            config
                .spreadsheet_id
                .as_deref()
                .unwrap_or(&config.spreadsheet_name),
            config.worksheet_title
        );
        info!("📧 发件人: {}", config.sender());
    }
    info!("🕒 时区: {}", config.timezone);
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("Kyle Larson", 20), "Kyle Larson");
        assert_eq!(truncate_text("Shane Van Gisbergen", 5), "Shane...");
    }
}
