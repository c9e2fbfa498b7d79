//! Stdout-based store fallback.
//!
//! When the `file-storage` feature is disabled, this implementation
//! outputs records as JSON to stdout for interoperability with external
//! tools and pipelines. Read operations always return `None` / empty (no
//! persistence across runs).

use crate::error::ComposeError;
use crate::store::{PlanRecord, PlanStore};
use async_trait::async_trait;

/// Store that outputs JSON to stdout.
///
/// Write operations serialize to JSON and print. Read operations return
/// `None` — there is no persistence.
///
/// Useful for:
/// - Piping plans to other tools (`compose | jq`)
/// - Environments without filesystem access
/// - Debugging / logging all composition records
pub struct StdoutStore;

impl StdoutStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StdoutStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PlanStore for StdoutStore {
    async fn save(&mut self, record: &PlanRecord) -> Result<(), ComposeError> {
        let json = serde_json::to_string_pretty(record)
            .map_err(|e| ComposeError::Storage(format!("failed to serialize record: {}", e)))?;
        println!("{}", json);
        Ok(())
    }

    async fn load(&self, _session_id: &str) -> Result<Option<PlanRecord>, ComposeError> {
        Ok(None)
    }

    async fn list(&self) -> Result<Vec<PlanRecord>, ComposeError> {
        Ok(Vec::new())
    }

    async fn delete(&mut self, _session_id: &str) -> Result<(), ComposeError> {
        Ok(())
    }
}
