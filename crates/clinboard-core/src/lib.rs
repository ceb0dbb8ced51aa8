//! Clinboard Core - the work-item tracking subsystem
//!
//! The board core behind the clinical-operations task screens:
//! - Loads task groups, tasks and reference data for one clinical context
//! - Resolves which managed group should receive ad-hoc tasks
//! - Provisions groups and first tasks, recovering from the stale-agenda-
//!   link and closed-group validation races exactly once each
//! - Assembles the filtered, ordered, render-ready row sequence
//!
//! # Example
//!
//! ```rust,ignore
//! use clinboard_core::{BoardConfig, TaskBoard};
//! use clinboard_model::{ClinicalContext, PatientId};
//!
//! # async fn example(backend: std::sync::Arc<dyn clinboard_core::ClinicalBackend>) {
//! let context = ClinicalContext::for_patient(PatientId(7));
//! let board = TaskBoard::new(backend, context, BoardConfig::new());
//!
//! board.reload().await;
//! board.add_task().await;
//! let view = board.view().await;
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod backend;
pub mod controller;
pub mod error;
pub mod loader;
pub mod provision;
pub mod resolver;
pub mod rows;

// Re-exports for convenience
pub use backend::{ClinicalBackend, NewTask, NewTaskGroup, TaskGroupPatch, TaskPatch};
pub use controller::{BoardConfig, BoardView, CloseKind, TaskBoard};
pub use error::{BackendError, BoardError, CreateTaskError, GroupWriteError};
pub use loader::{load_board, BoardData};
pub use provision::default_task_description;
pub use resolver::resolve_managed_group;
pub use rows::{assemble_rows, BoardFilter, BoardRow};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the board core
    pub use crate::{
        BoardConfig, BoardFilter, BoardRow, BoardView, ClinicalBackend, CloseKind, NewTask,
        NewTaskGroup, TaskBoard, TaskGroupPatch, TaskPatch,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
