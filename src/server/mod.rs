//! Reference data service
//!
//! Serves the roster snapshot from a single JSON file over REST. Clients
//! fetch everything and replace everything; there is no partial update, no
//! versioning and concurrent writers resolve as last-write-wins.

pub mod file_store;
pub mod handler;
pub mod types;

pub use file_store::FileStore;
pub use handler::{data_router, DataState};
