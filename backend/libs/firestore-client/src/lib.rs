//! Firestore Client Library
//!
//! Minimal Cloud Firestore REST (v1) client used by the leaderboard service
//! as its remote document store.
//!
//! It handles:
//! - OAuth2 token generation using Google service accounts
//! - Token caching with automatic refresh
//! - Ordered, limited structured queries over one collection
//! - Atomic batched writes (upserts and deletes) via `documents:commit`

pub mod client;
pub mod errors;
pub mod models;

pub use client::{CollectionRef, FirestoreClient};
pub use errors::FirestoreError;
pub use models::{Direction, Document, OrderBy, ServiceAccountKey, Value, WriteBatch, WriteOp};
