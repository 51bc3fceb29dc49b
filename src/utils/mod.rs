pub mod html;
pub mod logging;

pub use html::escape_html;
pub use logging::{log_startup, truncate_text};
