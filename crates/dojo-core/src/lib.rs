//! Dojo Core - Office and Living Space Allocation
//!
//! Allocates offices and living spaces to fellows and staff under fixed
//! capacities, and snapshots the whole allocation state to SQLite.
//!
//! # Architecture
//!
//! - **Components**: rooms and people, with invariant-preserving mutators
//! - **Engine**: the caller-owned [`Dojo`] that creates rooms, admits
//!   people and reallocates them
//! - **Persistence**: maps a dojo to table rows and back
//! - **Store**: SQLite schema, transactions and file signature checks
//!
//! # Example
//!
//! ```rust,no_run
//! use dojo_core::prelude::*;
//!
//! let mut dojo = Dojo::new();
//! dojo.create_room(RoomKind::Office, &["Blue"]);
//! dojo.create_room(RoomKind::LivingSpace, &["Python"]);
//!
//! let ann = dojo.add_person("Ann", PersonKind::Fellow, true)?;
//! assert_eq!(ann.office.as_deref(), Some("Blue"));
//!
//! dojo.save("dojo.db")?;
//! # Ok::<(), dojo_core::DojoError>(())
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod persistence;
pub mod store;
pub mod tables;

pub use engine::Dojo;
pub use error::{DojoError, Result, StorageError};

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{Admission, Dojo, Reallocation, Unallocated};
    pub use crate::error::{DojoError, StorageError};
}
