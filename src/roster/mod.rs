//! Roster module: the assignment grid's relational state
//!
//! People, committees (rows), programs (columns, grouped into collapsible
//! categories) and the assignments joining them, plus the derived views the
//! presentation layer reads.

pub mod search;
pub mod store;
pub mod types;
pub mod view;

pub use store::{RosterStore, UiFlags};
pub use types::*;
pub use view::{MatrixColumn, PersonSort, ProgramGroup};
