pub mod form_flow;
pub mod session;

pub use form_flow::{FormController, SubmitOutcome};
pub use session::{SessionId, SessionRegistry, SessionState};
