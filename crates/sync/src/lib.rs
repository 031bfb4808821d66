//! Client-side domain stores kept in sync with the REST backend.
//!
//! [`collection::Collection`] is the shared optimistic-update engine; the domain overlays add
//! derived views and the cross-store reloads their aggregates need.

pub mod collection;
pub mod finance;
pub mod journal;
pub mod projects;
pub mod schedule;
pub mod tasks;
pub mod telemetry;

pub use collection::{Collection, LoadState, ReconcilePolicy, StoreError};
pub use finance::FinanceStore;
pub use journal::JournalStore;
pub use projects::ProjectsStore;
pub use schedule::{DragController, DragOutcome, DragPhase, Point};
pub use tasks::TasksStore;
