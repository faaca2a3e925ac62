pub mod audit;
pub mod client;
pub mod compliance;
pub mod document;
pub mod ledger;
pub mod notification;
pub mod project;
pub mod role;
pub mod tally;
pub mod task;
pub mod user;

pub use audit::AuditLog;
pub use client::{Client, ClientStatus, ClientType};
pub use compliance::{ComplianceItem, ComplianceStatus, ComplianceType};
pub use document::{Document, FileVersion};
pub use ledger::{EntrySource, LedgerEntry};
pub use notification::Notification;
pub use project::{Project, ProjectStatus};
pub use role::Role;
pub use tally::{SyncStatus, TallySync};
pub use task::{Priority, TaskItem, TaskStatus};
pub use user::User;
