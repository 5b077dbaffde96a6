//! Historic data store.
//!
//! Every probe result is kept per service host in a single JSON file.

mod history;
mod models;

pub use history::*;
pub use models::*;
