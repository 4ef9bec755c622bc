pub mod log_ops;
pub mod reconcile;
pub mod rewrite;
pub mod summary;

pub use log_ops::{clean_name, close_open_entry, insert_open_entry, ClosedEntry, LogOpError};
pub use reconcile::{reconcile, Reconciliation};
pub use rewrite::{ensure_header, plan_rewrite, sort_entries, Rewrite, RewriteReason};
pub use summary::{sort_completed, summarize, SummaryRow};
