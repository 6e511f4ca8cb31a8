//! Trending score computation.
//!
//! A post's feed rank combines its cumulative counters with a recent-burst
//! signal, decayed by age so old posts fall off even when their totals stay
//! high. All times are UTC.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

/// Window for the recent-vote burst signal, in hours.
pub const RECENT_WINDOW_HOURS: i64 = 6;

/// Exponent controlling how sharply scores decay with age.
const DECAY_FACTOR: f64 = 1.5;

/// Feed ordering modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedOrder {
    /// Time-decayed popularity, ties broken by newest first.
    #[default]
    Trending,
    /// Newest first.
    Recent,
    /// Shuffled; every call may return a different order.
    Random,
}

/// Start of the recent-vote window relative to `now`.
#[must_use]
pub fn recent_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(RECENT_WINDOW_HOURS)
}

/// Compute a post's trending score.
///
/// `recent_votes` is the number of votes cast within the last
/// [`RECENT_WINDOW_HOURS`], counted at query time — this is what makes the
/// ordering responsive to bursts rather than purely cumulative.
#[must_use]
pub fn trending_score(
    vote_count: i32,
    comment_count: i32,
    created_at: DateTime<Utc>,
    recent_votes: u64,
    now: DateTime<Utc>,
) -> f64 {
    let age_hours = (now - created_at).num_seconds().max(0) as f64 / 3600.0;
    let decay = 1.0 / (1.0 + (age_hours / 24.0).powf(DECAY_FACTOR));

    let base = f64::from(vote_count) + 0.5 * f64::from(comment_count) + 2.0 * recent_votes as f64;

    base * decay
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_burst_outranks_equal_totals() {
        let now = Utc::now();
        let created = now - Duration::hours(12);

        let bursty = trending_score(50, 0, created, 30, now);
        let quiet = trending_score(50, 0, created, 0, now);
        assert!(bursty > quiet);
    }

    #[test]
    fn test_older_post_decays() {
        let now = Utc::now();

        let fresh = trending_score(50, 10, now - Duration::hours(1), 0, now);
        let stale = trending_score(50, 10, now - Duration::hours(72), 0, now);
        assert!(fresh > stale);
    }

    #[test]
    fn test_new_post_barely_decays() {
        let now = Utc::now();
        let score = trending_score(10, 0, now, 0, now);
        assert!((score - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_comments_weigh_half() {
        let now = Utc::now();
        let votes_only = trending_score(10, 0, now, 0, now);
        let comments_only = trending_score(0, 20, now, 0, now);
        assert!((votes_only - comments_only).abs() < 1e-9);
    }

    #[test]
    fn test_future_created_at_clamps_to_zero_age() {
        let now = Utc::now();
        let score = trending_score(10, 0, now + Duration::hours(1), 0, now);
        assert!((score - 10.0).abs() < 1e-9);
    }
}
