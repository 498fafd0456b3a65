//! History dedup gate
//!
//! A rapid repeat of the same lookup (same city, same weather description,
//! seconds apart) is one user action, not two history entries. The gate is a
//! pure O(n) scan over the current history; the write path bounds n via the
//! retention cap.

use crate::data::types::SearchEvent;

/// Decide whether a candidate event belongs in the history feed.
///
/// Returns `false` when an existing entry matches the candidate's city and
/// weather description with resolved timestamps less than `window_ms` apart.
/// Entries whose timestamps cannot be resolved never match, so the candidate
/// is appended.
pub fn should_append(existing: &[SearchEvent], candidate: &SearchEvent, window_ms: i64) -> bool {
    let Some(candidate_time) = candidate.resolved_time() else {
        return true;
    };

    !existing.iter().any(|entry| {
        entry.city == candidate.city
            && entry.weather == candidate.weather
            && entry.resolved_time().is_some_and(|entry_time| {
                (candidate_time - entry_time).num_milliseconds().abs() < window_ms
            })
    })
}
