pub mod sendgrid_client;
pub mod sheets_client;

pub use sendgrid_client::SendGridClient;
pub use sheets_client::{AccessToken, SheetsClient};
