//! Revision history of register items

pub mod resolver;

pub use resolver::{ChangeHistory, HistoryEntry, HistoryPage, HistoryResolver};
