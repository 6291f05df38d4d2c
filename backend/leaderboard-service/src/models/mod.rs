use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Deserialize, Serialize};

/// One named, timestamped score record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: u64,
    #[serde(with = "iso8601")]
    pub submitted_at: DateTime<Utc>,
}

impl LeaderboardEntry {
    pub fn new(name: impl Into<String>, score: u64, submitted_at: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            score,
            submitted_at,
        }
    }

    /// Case-insensitive uniqueness key.
    pub fn name_key(&self) -> String {
        self.name.to_lowercase()
    }
}

/// Submission timestamp, truncated to the millisecond precision it is persisted with.
pub fn submission_time() -> DateTime<Utc> {
    let now = Utc::now();
    now.duration_trunc(Duration::milliseconds(1)).unwrap_or(now)
}

/// Body of `POST /api/leaderboard`.
///
/// Both fields are kept loosely typed; coercion happens in validation so a
/// non-numeric score is reported as an invalid score, not a parse failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmitScoreRequest {
    #[serde(default)]
    pub name: Option<serde_json::Value>,
    #[serde(default)]
    pub score: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// `YYYY-MM-DDTHH:MM:SS.sssZ`
mod iso8601 {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
