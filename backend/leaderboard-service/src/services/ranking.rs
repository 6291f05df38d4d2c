//! Ordering, tie-break and truncation of leaderboard entries.

use std::collections::HashSet;

use crate::models::LeaderboardEntry;

/// Size of the persisted leaderboard.
pub const MAX_ENTRIES: usize = 5;

/// Sort by score descending, earlier submission first on ties, keep the top
/// [`MAX_ENTRIES`]. The sort is stable, so entries with identical
/// `(score, submitted_at)` keep their input order.
pub fn rank(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    sort_entries(&mut entries);
    entries.truncate(MAX_ENTRIES);
    entries
}

/// Bring stored data back under the ranking policy: one entry per
/// case-insensitive name (its best-ranked row), sorted and truncated.
///
/// Stores written by older clients may hold duplicates or more than
/// [`MAX_ENTRIES`] unsorted rows.
pub fn normalize(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    sort_entries(&mut entries);
    let mut seen = HashSet::new();
    entries.retain(|entry| seen.insert(entry.name_key()));
    entries.truncate(MAX_ENTRIES);
    entries
}

fn sort_entries(entries: &mut [LeaderboardEntry]) {
    entries.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
    });
}

/// Replace any entry sharing the candidate's case-insensitive name, then rank.
///
/// A submitter holds at most one slot and it reflects their most recent
/// score, not their best one.
pub fn upsert(entries: Vec<LeaderboardEntry>, candidate: LeaderboardEntry) -> Vec<LeaderboardEntry> {
    let key = candidate.name_key();
    let mut next: Vec<LeaderboardEntry> = entries
        .into_iter()
        .filter(|entry| entry.name_key() != key)
        .collect();
    next.push(candidate);
    rank(next)
}
