use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::models::{submission_time, LeaderboardEntry};
use crate::services::ranking;
use crate::services::store::{LeaderboardStore, StoreError};
use crate::services::validation::{coerce_score, normalize_name};

/// Read-modify-write orchestration over a [`LeaderboardStore`].
pub struct LeaderboardService {
    store: Arc<dyn LeaderboardStore>,
    /// Serializes submissions made through this service instance.
    write_gate: Mutex<()>,
}

impl LeaderboardService {
    pub fn new(store: Arc<dyn LeaderboardStore>) -> Self {
        Self {
            store,
            write_gate: Mutex::new(()),
        }
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Current leaderboard, always read from the store.
    pub async fn get_top(&self) -> std::result::Result<Vec<LeaderboardEntry>, StoreError> {
        self.store.load().await.map(ranking::normalize)
    }

    /// Validate a submission, upsert it by name and persist the new top list.
    ///
    /// Returns the list that was saved.
    pub async fn submit(
        &self,
        raw_name: Option<&Value>,
        raw_score: Option<&Value>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let score = coerce_score(raw_score).map_err(|e| {
            debug!("Rejected submission score {:?}", raw_score);
            e
        })?;
        let entry = LeaderboardEntry::new(normalize_name(raw_name), score, submission_time());

        let _guard = self.write_gate.lock().await;

        let current = ranking::normalize(self.store.load().await?);
        let next = ranking::upsert(current, entry.clone());
        self.store.save(&next).await?;

        info!(
            "Score submitted: name={}, score={}, on_board={}",
            entry.name,
            entry.score,
            next.contains(&entry)
        );
        Ok(next)
    }
}
