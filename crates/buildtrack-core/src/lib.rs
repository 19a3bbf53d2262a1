// File: buildtrack-core/src/lib.rs
// Purpose: Main entry point for buildtrack-core library

//! # buildtrack-core
//!
//! Domain types shared by the BuildTrack client crates.
//!
//! ## Quick Start
//!
//! ```rust
//! use buildtrack_core::{has_permission, Actor, Permission, Role};
//!
//! let foreman = Actor::new(7, Role::SiteSupervisor);
//! assert!(has_permission(Some(&foreman), Permission::CreateTask));
//! assert!(!has_permission(None, Permission::CreateTask));
//! ```

pub mod action;
pub mod ids;
pub mod permissions;
pub mod task;

pub use action::{ActionKind, ActionPayload, DocumentUpload, NewComment, NewTask, PendingAction, TaskPatch};
pub use ids::{EntityRef, ParseEntityRefError, TemporaryId};
pub use permissions::{has_permission, permissions_for, Actor, ParsePermissionError, ParseRoleError, Permission, Role};
pub use task::{ParseTaskStatusError, Task, TaskStatus};
