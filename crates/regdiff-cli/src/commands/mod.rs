pub mod diff;
pub mod history;
pub mod input;
