//! Data models for the civic ledger.
//!
//! Field names serialize in camelCase to match the web client.

mod alert;
mod comment;
mod identity;
mod post;
mod topic;

pub use alert::*;
pub use comment::*;
pub use identity::*;
pub use post::*;
pub use topic::*;
