use async_trait::async_trait;
use firestore_client::{CollectionRef, Document, FirestoreError, OrderBy, Value, WriteBatch};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::{LeaderboardStore, StoreError};
use crate::models::LeaderboardEntry;
use crate::services::ranking::MAX_ENTRIES;

/// Id used when a name slugs to nothing.
pub const PLACEHOLDER_DOCUMENT_ID: &str = "anonymous";

const FIELD_NAME: &str = "name";
const FIELD_SCORE: &str = "score";
const FIELD_SUBMITTED_AT: &str = "submittedAt";

/// Remote collection operations the document store relies on.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    async fn query(&self, order_by: &[OrderBy], limit: u32) -> Result<Vec<Document>, FirestoreError>;

    async fn list(&self) -> Result<Vec<Document>, FirestoreError>;

    /// Apply every write in `batch` atomically.
    async fn commit(&self, batch: WriteBatch) -> Result<(), FirestoreError>;
}

#[async_trait]
impl DocumentCollection for CollectionRef {
    async fn query(&self, order_by: &[OrderBy], limit: u32) -> Result<Vec<Document>, FirestoreError> {
        CollectionRef::query(self, order_by, limit).await
    }

    async fn list(&self) -> Result<Vec<Document>, FirestoreError> {
        CollectionRef::list(self).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), FirestoreError> {
        CollectionRef::commit(self, batch).await
    }
}

/// Stable document id for a name: lowercased, whitespace runs collapsed to
/// `-`, everything outside `[a-z0-9_-]` dropped.
pub fn document_id(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| matches!(c, 'a'..='z' | '0'..='9' | '_' | '-'))
        .collect();

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        PLACEHOLDER_DOCUMENT_ID.to_string()
    } else {
        slug.to_string()
    }
}

/// Leaderboard kept as one document per entry in a remote collection.
///
/// Every read goes to the collection; nothing is cached locally.
pub struct DocumentStore<C = CollectionRef> {
    collection: C,
}

impl<C: DocumentCollection> DocumentStore<C> {
    pub fn new(collection: C) -> Self {
        Self { collection }
    }

    fn to_fields(entry: &LeaderboardEntry) -> Result<HashMap<String, Value>, StoreError> {
        let score =
            i64::try_from(entry.score).map_err(|_| StoreError::ScoreOutOfRange(entry.score))?;

        Ok(HashMap::from([
            (FIELD_NAME.to_string(), Value::string(entry.name.clone())),
            (FIELD_SCORE.to_string(), Value::integer(score)),
            (
                FIELD_SUBMITTED_AT.to_string(),
                Value::timestamp(entry.submitted_at),
            ),
        ]))
    }

    fn from_document(doc: &Document) -> Option<LeaderboardEntry> {
        let name = doc.field(FIELD_NAME)?.as_str()?;
        let score = u64::try_from(doc.field(FIELD_SCORE)?.as_i64()?).ok()?;
        let submitted_at = doc.field(FIELD_SUBMITTED_AT)?.as_timestamp()?;
        Some(LeaderboardEntry::new(name, score, submitted_at))
    }
}

#[async_trait]
impl<C: DocumentCollection> LeaderboardStore for DocumentStore<C> {
    async fn load(&self) -> Result<Vec<LeaderboardEntry>, StoreError> {
        let order_by = [OrderBy::desc(FIELD_SCORE), OrderBy::asc(FIELD_SUBMITTED_AT)];
        let documents = self.collection.query(&order_by, MAX_ENTRIES as u32).await?;

        Ok(documents
            .iter()
            .filter_map(|doc| {
                let entry = Self::from_document(doc);
                if entry.is_none() {
                    warn!("Skipping malformed leaderboard document: {}", doc.id());
                }
                entry
            })
            .collect())
    }

    async fn save(&self, entries: &[LeaderboardEntry]) -> Result<(), StoreError> {
        let existing = self.collection.list().await?;

        let mut batch = WriteBatch::new();
        let mut written: HashSet<String> = HashSet::new();
        for entry in entries {
            // Distinct names can share a slug; suffix so neither is overwritten
            let base = document_id(&entry.name);
            let mut id = base.clone();
            let mut n = 2;
            while written.contains(&id) {
                id = format!("{}-{}", base, n);
                n += 1;
            }
            batch.set(id.clone(), Self::to_fields(entry)?);
            written.insert(id);
        }

        // Whatever is not rewritten is no longer on the board
        let mut deleted = 0;
        for doc in &existing {
            if !written.contains(doc.id()) {
                batch.delete(doc.id());
                deleted += 1;
            }
        }

        debug!(
            "Saving leaderboard: {} writes, {} of them deletes",
            batch.len(),
            deleted
        );
        self.collection.commit(batch).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "document"
    }
}
