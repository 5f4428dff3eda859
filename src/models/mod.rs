pub mod log;
pub mod server;

pub use log::{LogEntry, LogLevel};
pub use server::{CheckStatus, ServerDraft, ServerRecord, TransportType};
