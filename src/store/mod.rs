//! Persistence layer for composed plans.
//!
//! This module contains:
//! - [`PlanStore`] trait — plan record persistence by session id
//! - [`PlanRecord`] — on-disk representation with encrypted secret material
//! - [`FilePlanStore`] — file-backed implementation (feature `file-storage`)
//! - [`StdoutStore`] — JSON-to-stdout fallback

mod record;
mod store;
pub mod stdout;

#[cfg(feature = "file-storage")]
pub mod file_backed;

pub use record::PlanRecord;
pub use store::PlanStore;
pub use stdout::StdoutStore;

#[cfg(feature = "file-storage")]
pub use file_backed::FilePlanStore;

#[cfg(test)]
mod tests;
