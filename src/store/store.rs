//! [`PlanStore`] trait definition.

use crate::error::ComposeError;
use crate::store::PlanRecord;
use async_trait::async_trait;

/// Trait for persisting plan records indexed by session id.
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Save a plan record. Overwrites any existing record for this session.
    async fn save(&mut self, record: &PlanRecord) -> Result<(), ComposeError>;

    /// Load a plan record by session id. Returns `None` if not found.
    async fn load(&self, session_id: &str) -> Result<Option<PlanRecord>, ComposeError>;

    /// List all stored plan records.
    async fn list(&self) -> Result<Vec<PlanRecord>, ComposeError>;

    /// Delete a plan record by session id. Idempotent.
    async fn delete(&mut self, session_id: &str) -> Result<(), ComposeError>;
}
