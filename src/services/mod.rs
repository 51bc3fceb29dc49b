pub mod memory_sheet;
pub mod notifier;
pub mod submission_store;
pub mod validator;

pub use memory_sheet::MemorySheet;
pub use notifier::{EmailMessage, LogMailer, Mailer, Notifier};
pub use submission_store::{HeaderStatus, SheetBackend, SheetHandle, SubmissionStore};
pub use validator::validate;
