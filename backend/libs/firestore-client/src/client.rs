use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::FirestoreError;
use crate::models::*;

const DEFAULT_BASE_URL: &str = "https://firestore.googleapis.com/v1";
const DATASTORE_SCOPE: &str = "https://www.googleapis.com/auth/datastore";
const LIST_PAGE_SIZE: u32 = 300;

/// Cloud Firestore REST Client
///
/// Manages OAuth2 token generation and caching for a service account, and
/// issues queries and batched commits against the project's default database.
pub struct FirestoreClient {
    pub project_id: String,
    pub credentials: Arc<ServiceAccountKey>,
    base_url: String,
    token_cache: Arc<Mutex<Option<TokenCache>>>,
    http_client: reqwest::Client,
}

impl FirestoreClient {
    /// Create new Firestore client
    ///
    /// # Arguments
    /// * `credentials` - Service account key; its `project_id` selects the database
    pub fn new(credentials: ServiceAccountKey) -> Self {
        Self {
            project_id: credentials.project_id.clone(),
            credentials: Arc::new(credentials),
            base_url: DEFAULT_BASE_URL.to_string(),
            token_cache: Arc::new(Mutex::new(None)),
            http_client: reqwest::Client::new(),
        }
    }

    /// Point the client at another endpoint (e.g. the Firestore emulator).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Handle scoped to one collection.
    pub fn collection(self: &Arc<Self>, collection_id: impl Into<String>) -> CollectionRef {
        CollectionRef {
            client: Arc::clone(self),
            collection_id: collection_id.into(),
        }
    }

    /// `projects/{p}/databases/(default)/documents`
    pub fn documents_root(&self) -> String {
        format!("projects/{}/databases/(default)/documents", self.project_id)
    }

    pub fn document_name(&self, collection_id: &str, document_id: &str) -> String {
        format!("{}/{}/{}", self.documents_root(), collection_id, document_id)
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.documents_root())
    }

    /// Run a structured query over `collection_id`.
    pub async fn run_query(
        &self,
        collection_id: &str,
        order_by: &[OrderBy],
        limit: u32,
    ) -> Result<Vec<Document>, FirestoreError> {
        let request = RunQueryRequest {
            structured_query: StructuredQuery {
                from: vec![CollectionSelector {
                    collection_id: collection_id.to_string(),
                }],
                order_by: order_by
                    .iter()
                    .map(|o| WireOrder {
                        field: FieldReference {
                            field_path: o.field.clone(),
                        },
                        direction: o.direction,
                    })
                    .collect(),
                limit,
            },
        };

        let url = format!("{}:runQuery", self.documents_url());
        let items: Vec<RunQueryResponseItem> = self.post_json(&url, &request).await?;

        // Items without a document only carry a read time
        Ok(items.into_iter().filter_map(|item| item.document).collect())
    }

    /// List every document in `collection_id`, following page tokens.
    pub async fn list_documents(&self, collection_id: &str) -> Result<Vec<Document>, FirestoreError> {
        let url = format!("{}/{}", self.documents_url(), collection_id);
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let access_token = self.get_access_token().await?;
            let mut request = self
                .http_client
                .get(&url)
                .header("Authorization", format!("Bearer {}", access_token))
                .query(&[("pageSize", LIST_PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| FirestoreError::RequestError(e.to_string()))?;
            let page: ListDocumentsResponse = Self::parse_response(response).await?;

            documents.extend(page.documents);
            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(documents)
    }

    /// Apply all writes in `batch` atomically.
    pub async fn commit(&self, collection_id: &str, batch: WriteBatch) -> Result<(), FirestoreError> {
        if batch.is_empty() {
            return Ok(());
        }

        let writes = batch
            .into_writes()
            .into_iter()
            .map(|op| match op {
                WriteOp::Set { id, fields } => WireWrite::Update(Document {
                    name: self.document_name(collection_id, &id),
                    fields,
                    ..Default::default()
                }),
                WriteOp::Delete { id } => WireWrite::Delete(self.document_name(collection_id, &id)),
            })
            .collect::<Vec<_>>();

        debug!(
            "Committing {} writes to collection {}",
            writes.len(),
            collection_id
        );

        let url = format!("{}:commit", self.documents_url());
        let _: serde_json::Value = self.post_json(&url, &CommitRequest { writes }).await?;
        Ok(())
    }

    async fn post_json<B, T>(&self, url: &str, body: &B) -> Result<T, FirestoreError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let access_token = self.get_access_token().await?;

        let response = self
            .http_client
            .post(url)
            .header("Authorization", format!("Bearer {}", access_token))
            .json(body)
            .send()
            .await
            .map_err(|e| FirestoreError::RequestError(e.to_string()))?;

        Self::parse_response(response).await
    }

    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FirestoreError> {
        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(FirestoreError::ApiError(status.to_string(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| FirestoreError::ResponseParseError(e.to_string()))
    }

    /// Get access token from service account (with caching)
    pub async fn get_access_token(&self) -> Result<String, FirestoreError> {
        let mut cache = self.token_cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            // Reuse while valid for at least 60 more seconds
            if cached.expires_at > Utc::now().timestamp() + 60 {
                return Ok(cached.access_token.clone());
            }
        }

        let assertion = self.signed_assertion()?;
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", assertion.as_str()),
        ];

        let response = self
            .http_client
            .post(&self.credentials.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FirestoreError::TokenError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FirestoreError::TokenRequestFailed(
                response.status().to_string(),
            ));
        }

        let token_response: GoogleTokenResponse = response
            .json()
            .await
            .map_err(|e| FirestoreError::TokenParseError(e.to_string()))?;

        *cache = Some(TokenCache {
            access_token: token_response.access_token.clone(),
            expires_at: Utc::now().timestamp() + token_response.expires_in,
        });

        Ok(token_response.access_token)
    }

    fn signed_assertion(&self) -> Result<String, FirestoreError> {
        let now = Utc::now();
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            sub: self.credentials.client_email.clone(),
            scope: DATASTORE_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())
            .map_err(|e| FirestoreError::KeyParseError(e.to_string()))?;

        encode(&Header::new(Algorithm::RS256), &claims, &encoding_key)
            .map_err(|e| FirestoreError::JwtEncodeError(e.to_string()))
    }
}

/// A [`FirestoreClient`] bound to one collection.
#[derive(Clone)]
pub struct CollectionRef {
    client: Arc<FirestoreClient>,
    collection_id: String,
}

impl CollectionRef {
    pub fn id(&self) -> &str {
        &self.collection_id
    }

    pub async fn query(&self, order_by: &[OrderBy], limit: u32) -> Result<Vec<Document>, FirestoreError> {
        self.client
            .run_query(&self.collection_id, order_by, limit)
            .await
    }

    pub async fn list(&self) -> Result<Vec<Document>, FirestoreError> {
        self.client.list_documents(&self.collection_id).await
    }

    pub async fn commit(&self, batch: WriteBatch) -> Result<(), FirestoreError> {
        self.client.commit(&self.collection_id, batch).await
    }

    /// Shorthand for a single-document upsert.
    pub async fn set_document(
        &self,
        id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<(), FirestoreError> {
        let mut batch = WriteBatch::new();
        batch.set(id, fields);
        self.commit(batch).await
    }

    pub async fn delete_document(&self, id: &str) -> Result<(), FirestoreError> {
        let mut batch = WriteBatch::new();
        batch.delete(id);
        self.commit(batch).await
    }
}
