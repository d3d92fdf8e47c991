pub mod history;
pub mod session;

pub use history::{History, HistoryEntry, HistoryError};
pub use session::{RunSummary, Session, SessionError};
