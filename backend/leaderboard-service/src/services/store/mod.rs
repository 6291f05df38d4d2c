//! Leaderboard persistence backends.
//!
//! One backend is chosen at startup by [`build_store`] and shared for the
//! process lifetime.

mod document_store;
mod file_store;

use async_trait::async_trait;
use firestore_client::{FirestoreClient, FirestoreError, ServiceAccountKey};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::LeaderboardEntry;

pub use document_store::{document_id, DocumentCollection, DocumentStore, PLACEHOLDER_DOCUMENT_ID};
pub use file_store::FileStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote store error: {0}")]
    Remote(#[from] FirestoreError),

    #[error("Score {0} does not fit the remote integer field")]
    ScoreOutOfRange(u64),
}

/// Load/save capability shared by every backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeaderboardStore: Send + Sync {
    /// Current persisted leaderboard.
    async fn load(&self) -> Result<Vec<LeaderboardEntry>, StoreError>;

    /// Replace the persisted leaderboard with `entries`.
    async fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), StoreError>;

    /// Short backend name for logs.
    fn backend(&self) -> &'static str;
}

/// Pick the backend: the document store when a full credential set is
/// configured, the local file otherwise.
pub fn build_store(config: &Config) -> Arc<dyn LeaderboardStore> {
    match config.document_store_credentials() {
        Some(creds) => {
            info!(
                "Using document store: project={}, collection={}",
                creds.project_id, config.firestore_collection
            );
            let mut client = FirestoreClient::new(ServiceAccountKey::new(
                creds.project_id,
                creds.client_email,
                creds.private_key,
            ));
            if let Some(base_url) = &config.firestore_base_url {
                info!("Using Firestore endpoint {}", base_url);
                client = client.with_base_url(base_url.clone());
            }
            let client = Arc::new(client);
            Arc::new(DocumentStore::new(client.collection(config.firestore_collection.clone())))
        }
        None => {
            let store = FileStore::new(config.leaderboard_file.clone());
            info!(
                "Document store credentials not configured, using file store at {}",
                store.path().display()
            );
            Arc::new(store)
        }
    }
}
