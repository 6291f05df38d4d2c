pub mod leaderboard;
pub mod ranking;
pub mod store;
pub mod validation;

pub use leaderboard::LeaderboardService;
pub use store::{build_store, LeaderboardStore, StoreError};
pub use validation::ValidationError;
