//! Volunteer Matrix - committee/program assignment grid
//!
//! Volunteer Matrix keeps track of which volunteers work in which
//! (committee, program) cell. Committees are the rows of the grid, programs
//! the columns, and programs can be clustered into collapsible groups.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Client process                        │
//! │                                                              │
//! │   command ──▶ ┌──────────────┐   reads   ┌────────────────┐  │
//! │               │ RosterStore  │ ────────▶ │ Derived views  │  │
//! │               │ (in memory)  │           │ groups / cells │  │
//! │               └──────┬───────┘           │ search / sort  │  │
//! │                      │ SyncIntent        └────────────────┘  │
//! │               ┌──────▼───────┐                               │
//! │               │ Synchronizer │  debounce (1s), latest only   │
//! │               └──────┬───────┘                               │
//! └──────────────────────┼───────────────────────────────────────┘
//!                        │ GET / POST /api/data (full snapshot)
//! ┌──────────────────────▼───────────────────────────────────────┐
//! │            Data service (axum) ──▶ data.json                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`roster`]: entities, relational store and derived views
//! - [`sync`]: debounced persistence and the data service client
//! - [`backup`]: export documents and validated import
//! - [`server`]: flat-file data service
//! - [`api`]: HTTP application assembly
//! - [`config`]: Configuration management

pub mod api;
pub mod backup;
pub mod config;
pub mod error;
pub mod roster;
pub mod server;
pub mod sync;

pub use config::AppConfig;
pub use error::{Error, Result};
pub use roster::RosterStore;
