use serde::Deserialize;
use std::path::PathBuf;

/// Service configuration, read from the environment (upper-cased field names).
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for every non-API path
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,

    /// JSON document backing the file store
    #[serde(default = "default_leaderboard_file")]
    pub leaderboard_file: PathBuf,

    pub firebase_project_id: Option<String>,
    pub firebase_client_email: Option<String>,
    pub firebase_private_key: Option<String>,

    #[serde(default = "default_firestore_collection")]
    pub firestore_collection: String,

    /// Firestore REST endpoint override, e.g. a local emulator
    pub firestore_base_url: Option<String>,
}

/// Complete credential set for the remote document store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentStoreCredentials {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenv::dotenv().ok();
        envy::from_env::<Config>()
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, envy::Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        envy::from_iter(vars)
    }

    /// Credentials for the document store, or `None` unless all three are set.
    pub fn document_store_credentials(&self) -> Option<DocumentStoreCredentials> {
        let present = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Some(DocumentStoreCredentials {
            project_id: present(&self.firebase_project_id)?,
            client_email: present(&self.firebase_client_email)?,
            // Keys pasted into env files carry escaped newlines
            private_key: present(&self.firebase_private_key)?.replace("\\n", "\n"),
        })
    }
}

fn default_port() -> u16 {
    3000
}

fn default_static_root() -> PathBuf {
    PathBuf::from("public")
}

fn default_leaderboard_file() -> PathBuf {
    PathBuf::from("data").join("leaderboard.json")
}

fn default_firestore_collection() -> String {
    "leaderboard".to_string()
}
