//! File-backed plan store.
//!
//! Stores each plan record as `{session_id}/plan.json` under
//! `~/.edgedb-compose/sessions/`.

use crate::error::ComposeError;
use crate::store::{PlanRecord, PlanStore};
use async_trait::async_trait;
use std::path::PathBuf;

/// File-backed implementation of [`PlanStore`].
///
/// Each plan is stored as `{sessions_dir}/{session_id}/plan.json`.
pub struct FilePlanStore {
    sessions_dir: PathBuf,
}

impl FilePlanStore {
    /// Create a store using the default directory (`~/.edgedb-compose/sessions`).
    pub async fn new_default() -> Result<Self, ComposeError> {
        let home = dirs::home_dir()
            .ok_or_else(|| ComposeError::Storage("could not determine home directory".into()))?;
        let sessions_dir = home.join(".edgedb-compose").join("sessions");
        Self::new(sessions_dir).await
    }

    /// Create a store at a custom directory path.
    pub async fn new(sessions_dir: PathBuf) -> Result<Self, ComposeError> {
        tokio::fs::create_dir_all(&sessions_dir)
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to create sessions dir: {}", e)))?;

        Ok(Self { sessions_dir })
    }

    fn record_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(session_id).join("plan.json")
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.sessions_dir.join(session_id)
    }
}

#[async_trait]
impl PlanStore for FilePlanStore {
    async fn save(&mut self, record: &PlanRecord) -> Result<(), ComposeError> {
        let dir = self.session_dir(&record.session_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to create session dir: {}", e)))?;

        let content = serde_json::to_string_pretty(record)
            .map_err(|e| ComposeError::Storage(format!("failed to serialize record: {}", e)))?;

        let path = self.record_path(&record.session_id);
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to write record: {}", e)))?;

        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<PlanRecord>, ComposeError> {
        let path = self.record_path(session_id);

        if tokio::fs::metadata(&path).await.is_err() {
            return Ok(None);
        }

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to read record: {}", e)))?;

        let record = serde_json::from_str(&content)
            .map_err(|e| ComposeError::Storage(format!("failed to parse record: {}", e)))?;

        Ok(Some(record))
    }

    async fn list(&self) -> Result<Vec<PlanRecord>, ComposeError> {
        let mut records = Vec::new();

        let mut entries = tokio::fs::read_dir(&self.sessions_dir)
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to read sessions dir: {}", e)))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ComposeError::Storage(format!("failed to read dir entry: {}", e)))?
        {
            let plan_path = entry.path().join("plan.json");
            if let Ok(content) = tokio::fs::read_to_string(&plan_path).await {
                if let Ok(record) = serde_json::from_str::<PlanRecord>(&content) {
                    records.push(record);
                }
            }
        }

        Ok(records)
    }

    async fn delete(&mut self, session_id: &str) -> Result<(), ComposeError> {
        let dir = self.session_dir(session_id);
        if tokio::fs::metadata(&dir).await.is_ok() {
            tokio::fs::remove_dir_all(&dir)
                .await
                .map_err(|e| ComposeError::Storage(format!("failed to delete record: {}", e)))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DeploymentRequest;
    use crate::state::{ComposeState, Step};

    fn make_record(session_id: &str) -> PlanRecord {
        let mut state = ComposeState::new(session_id, DeploymentRequest::default());
        state.transition(Step::Network);
        PlanRecord::from_state(&state, "pw").unwrap()
    }

    #[tokio::test]
    async fn test_file_plan_store_lifecycle() {
        let temp_dir =
            std::env::temp_dir().join(format!("edgedb-compose-test-{}", rand::random::<u32>()));
        let mut store = FilePlanStore::new(temp_dir.clone()).await.unwrap();

        let record = make_record("session-a");

        // Save
        store.save(&record).await.unwrap();

        // Load
        let loaded = store.load("session-a").await.unwrap();
        assert!(loaded.is_some());
        let loaded = loaded.unwrap();
        assert_eq!(loaded.session_id, "session-a");
        assert!(matches!(loaded.step, Step::Network));

        // List
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].session_id, "session-a");

        // Load non-existent
        let missing = store.load("session-z").await.unwrap();
        assert!(missing.is_none());

        // Delete
        store.delete("session-a").await.unwrap();
        let deleted = store.load("session-a").await.unwrap();
        assert!(deleted.is_none());

        // Delete idempotent
        store.delete("session-a").await.unwrap();

        // Cleanup
        let _ = tokio::fs::remove_dir_all(temp_dir).await;
    }

    #[tokio::test]
    async fn test_file_plan_store_overwrite() {
        let temp_dir =
            std::env::temp_dir().join(format!("edgedb-compose-test-{}", rand::random::<u32>()));
        let mut store = FilePlanStore::new(temp_dir.clone()).await.unwrap();

        let mut record = make_record("session-a");
        store.save(&record).await.unwrap();

        // Overwrite with updated step
        record.step = Step::Complete;
        store.save(&record).await.unwrap();

        let loaded = store.load("session-a").await.unwrap().unwrap();
        assert!(matches!(loaded.step, Step::Complete));

        let _ = tokio::fs::remove_dir_all(temp_dir).await;
    }

    #[tokio::test]
    async fn test_file_plan_store_list_multiple() {
        let temp_dir =
            std::env::temp_dir().join(format!("edgedb-compose-test-{}", rand::random::<u32>()));
        let mut store = FilePlanStore::new(temp_dir.clone()).await.unwrap();

        store.save(&make_record("alpha")).await.unwrap();
        store.save(&make_record("beta")).await.unwrap();
        store.save(&make_record("gamma")).await.unwrap();

        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 3);

        let mut ids: Vec<String> = all.iter().map(|r| r.session_id.clone()).collect();
        ids.sort();
        assert_eq!(ids, vec!["alpha", "beta", "gamma"]);

        // Delete one, list should have 2
        store.delete("beta").await.unwrap();
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 2);

        let _ = tokio::fs::remove_dir_all(temp_dir).await;
    }

    #[tokio::test]
    async fn test_file_plan_store_list_ignores_bad_files() {
        let temp_dir =
            std::env::temp_dir().join(format!("edgedb-compose-test-{}", rand::random::<u32>()));
        let mut store = FilePlanStore::new(temp_dir.clone()).await.unwrap();

        store.save(&make_record("good")).await.unwrap();

        // Write garbage in another session dir
        let bad_dir = temp_dir.join("bad");
        tokio::fs::create_dir_all(&bad_dir).await.unwrap();
        tokio::fs::write(bad_dir.join("plan.json"), "not valid json")
            .await
            .unwrap();

        // Also create a dir without plan.json
        let empty_dir = temp_dir.join("empty");
        tokio::fs::create_dir_all(&empty_dir).await.unwrap();

        // List should only return the valid record
        let all = store.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].session_id, "good");

        let _ = tokio::fs::remove_dir_all(temp_dir).await;
    }

    #[tokio::test]
    async fn test_file_plan_store_persist_across_instances() {
        let temp_dir =
            std::env::temp_dir().join(format!("edgedb-compose-test-{}", rand::random::<u32>()));

        // Save in first instance
        {
            let mut store = FilePlanStore::new(temp_dir.clone()).await.unwrap();
            store.save(&make_record("persist")).await.unwrap();
        }

        // New instance should be able to load it
        let store2 = FilePlanStore::new(temp_dir.clone()).await.unwrap();
        let loaded = store2.load("persist").await.unwrap();
        assert!(loaded.is_some());

        let all = store2.list().await.unwrap();
        assert_eq!(all.len(), 1);

        let _ = tokio::fs::remove_dir_all(temp_dir).await;
    }
}
