pub mod claim;
pub mod lease;
pub mod mailcode;
pub mod retry;
pub mod select;

pub use claim::{claim, Assignment, ClaimOutcome};
pub use lease::{refresh, time_code, view, LeaseView, Refresh};
pub use mailcode::fetch_mail_code;
pub use select::select_credential;
