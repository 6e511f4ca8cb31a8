//! Results aggregation.
//!
//! Results are computed freshly from vote rows for every field that needs a
//! per-attribute or per-position breakdown; the denormalized counters are
//! authoritative only for raw vote counts and percentages.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use rateit_common::{AppError, AppResult};
use rateit_db::{
    entities::{PostType, item},
    repositories::{ItemRepository, PostRepository, VoteRepository},
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

/// Sentinel average position for items no ballot has ranked; sorts last.
const UNRANKED_POSITION: f64 = 999.0;

/// Results service for business logic.
#[derive(Clone)]
pub struct ResultsService {
    post_repo: PostRepository,
    item_repo: ItemRepository,
    vote_repo: VoteRepository,
}

/// Full results response for a post.
#[derive(Debug, Serialize)]
pub struct PostResults {
    /// Post summary.
    pub post: PostSummary,
    /// Computed results.
    pub results: ResultsBody,
}

/// Post summary attached to results.
#[derive(Debug, Serialize)]
pub struct PostSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub caption: Option<String>,
    pub vote_count: i32,
    pub comment_count: i32,
    pub expires_at: Option<DateTimeWithTimeZone>,
}

/// Winner and per-item breakdown.
#[derive(Debug, Serialize)]
pub struct ResultsBody {
    /// Winning item, absent for posts without items.
    pub winner: Option<Winner>,
    /// Per-item results, ordered by display order (rank posts: by average
    /// position).
    pub items: Vec<ResultItem>,
}

/// The winning item of a post.
#[derive(Debug, Clone, Serialize)]
pub struct Winner {
    pub item_id: String,
    pub name: String,
    /// Average finishing position (rank posts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_position: Option<f64>,
    /// Mean of the per-attribute mean scores (rate/compare posts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<f64>,
}

/// Per-item result entry.
#[derive(Debug, Clone, Serialize)]
pub struct ResultItem {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub vote_count: i32,
    pub percentage: f64,
    /// Average finishing position (rank posts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_position: Option<f64>,
    /// Attribute → mean score, one decimal (rate/compare posts with votes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_scores: Option<BTreeMap<String, f64>>,
    /// Raw score → count, buckets "1".."10" (rate/compare posts with votes).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score_distribution: Option<BTreeMap<String, i64>>,
}

impl ResultsService {
    /// Create a new results service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        item_repo: ItemRepository,
        vote_repo: VoteRepository,
    ) -> Self {
        Self {
            post_repo,
            item_repo,
            vote_repo,
        }
    }

    /// Compute the results for a post, branching on its type. Read-only.
    pub async fn compute_results(&self, post_id: &str) -> AppResult<PostResults> {
        let post = self.post_repo.get_by_id(post_id).await?;
        let items = self.item_repo.find_by_post(post_id).await?;

        let (result_items, winner) = match post.post_type {
            PostType::Rank => {
                let rankings = self.load_rankings(post_id).await?;
                rank_results(&items, &rankings)
            }
            PostType::Rate | PostType::Compare => {
                let mut ratings_per_item = Vec::with_capacity(items.len());
                for item in &items {
                    ratings_per_item.push(self.load_item_ratings(&item.id).await?);
                }
                rating_results(post.vote_count, &items, &ratings_per_item)
            }
            PostType::Poll | PostType::WouldYouRather => {
                selection_results(post.vote_count, &items)
            }
        };

        Ok(PostResults {
            post: PostSummary {
                id: post.id,
                post_type: post.post_type,
                caption: post.caption,
                vote_count: post.vote_count,
                comment_count: post.comment_count,
                expires_at: post.expires_at,
            },
            results: ResultsBody {
                winner,
                items: result_items,
            },
        })
    }

    async fn load_rankings(&self, post_id: &str) -> AppResult<Vec<Vec<String>>> {
        let votes = self.vote_repo.find_rankings(post_id).await?;
        votes
            .into_iter()
            .filter_map(|v| v.ranking)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| AppError::Internal(format!("Invalid stored ranking: {e}")))
            })
            .collect()
    }

    async fn load_item_ratings(&self, item_id: &str) -> AppResult<Vec<HashMap<String, i32>>> {
        let votes = self.vote_repo.find_ratings_by_item(item_id).await?;
        votes
            .into_iter()
            .filter_map(|v| v.ratings)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| AppError::Internal(format!("Invalid stored ratings: {e}")))
            })
            .collect()
    }
}

/// Round to one decimal place.
fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Round to two decimal places.
fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Share of a post's ballots that referenced this item, as a percentage.
fn percentage(item_votes: i32, post_votes: i32) -> f64 {
    if post_votes > 0 {
        round1(f64::from(item_votes) / f64::from(post_votes) * 100.0)
    } else {
        0.0
    }
}

/// Aggregate rank ballots: average finishing position per item, best first.
///
/// Items are sorted ascending by average position with a stable sort, so
/// ties keep the original display order. Items nobody ranked sort last via
/// the sentinel position.
pub(crate) fn rank_results(
    items: &[item::Model],
    rankings: &[Vec<String>],
) -> (Vec<ResultItem>, Option<Winner>) {
    let mut position_sums: HashMap<&str, i64> = HashMap::new();
    let mut position_counts: HashMap<&str, i64> = HashMap::new();
    for item in items {
        position_sums.insert(item.id.as_str(), 0);
        position_counts.insert(item.id.as_str(), 0);
    }

    for ranking in rankings {
        for (index, item_id) in ranking.iter().enumerate() {
            // Index 0 is 1st place
            if let Some(sum) = position_sums.get_mut(item_id.as_str()) {
                *sum += index as i64 + 1;
                if let Some(count) = position_counts.get_mut(item_id.as_str()) {
                    *count += 1;
                }
            }
        }
    }

    let mut rows: Vec<ResultItem> = items
        .iter()
        .map(|item| {
            let count = position_counts.get(item.id.as_str()).copied().unwrap_or(0);
            let avg_position = if count > 0 {
                let sum = position_sums.get(item.id.as_str()).copied().unwrap_or(0);
                round2(sum as f64 / count as f64)
            } else {
                UNRANKED_POSITION
            };
            ResultItem {
                id: item.id.clone(),
                name: item.name.clone(),
                image_url: item.image_url.clone(),
                vote_count: count as i32,
                percentage: 0.0,
                avg_position: Some(avg_position),
                avg_scores: None,
                score_distribution: None,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.avg_position
            .partial_cmp(&b.avg_position)
            .unwrap_or(Ordering::Equal)
    });

    let winner = rows.first().map(|row| Winner {
        item_id: row.id.clone(),
        name: row.name.clone(),
        avg_position: row.avg_position,
        overall_score: None,
        percentage: None,
    });

    (rows, winner)
}

/// Attribute → mean score (one decimal) over a set of rating maps.
pub(crate) fn attribute_means(ratings: &[HashMap<String, i32>]) -> BTreeMap<String, f64> {
    let mut sums: BTreeMap<&str, i64> = BTreeMap::new();
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();

    for rating in ratings {
        for (attr, score) in rating {
            *sums.entry(attr.as_str()).or_insert(0) += i64::from(*score);
            *counts.entry(attr.as_str()).or_insert(0) += 1;
        }
    }

    sums.into_iter()
        .map(|(attr, sum)| {
            let count = counts.get(attr).copied().unwrap_or(1);
            (attr.to_string(), round1(sum as f64 / count as f64))
        })
        .collect()
}

/// Aggregate rate/compare ballots: per-attribute means, score histogram,
/// winner by mean-of-means.
pub(crate) fn rating_results(
    post_vote_count: i32,
    items: &[item::Model],
    ratings_per_item: &[Vec<HashMap<String, i32>>],
) -> (Vec<ResultItem>, Option<Winner>) {
    let empty = Vec::new();
    let rows: Vec<ResultItem> = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let ratings = ratings_per_item.get(index).unwrap_or(&empty);
            let (avg_scores, score_distribution) = if ratings.is_empty() {
                (None, None)
            } else {
                let mut distribution: BTreeMap<String, i64> =
                    (1..=10).map(|score| (score.to_string(), 0)).collect();
                for rating in ratings {
                    for score in rating.values() {
                        *distribution.entry(score.to_string()).or_insert(0) += 1;
                    }
                }
                (Some(attribute_means(ratings)), Some(distribution))
            };

            ResultItem {
                id: item.id.clone(),
                name: item.name.clone(),
                image_url: item.image_url.clone(),
                vote_count: item.vote_count,
                percentage: percentage(item.vote_count, post_vote_count),
                avg_position: None,
                avg_scores,
                score_distribution,
            }
        })
        .collect();

    // Winner = highest mean of the per-attribute means, not a weighted sum:
    // an item rated on fewer attributes is not penalized for it. The
    // strictly-greater comparison keeps the first item on ties.
    let mut best: Option<(&ResultItem, f64)> = None;
    for row in &rows {
        let score = overall_score(row).unwrap_or(0.0);
        if best.as_ref().is_none_or(|(_, best_score)| score > *best_score) {
            best = Some((row, score));
        }
    }
    let winner = best.map(|(row, _)| Winner {
            item_id: row.id.clone(),
            name: row.name.clone(),
            avg_position: None,
            overall_score: overall_score(row),
            percentage: Some(row.percentage),
        });

    (rows, winner)
}

/// Mean of an item's per-attribute mean scores.
fn overall_score(row: &ResultItem) -> Option<f64> {
    row.avg_scores.as_ref().and_then(|scores| {
        if scores.is_empty() {
            None
        } else {
            Some(scores.values().sum::<f64>() / scores.len() as f64)
        }
    })
}

/// Aggregate poll/wyr ballots: percentages only, winner by vote count.
pub(crate) fn selection_results(
    post_vote_count: i32,
    items: &[item::Model],
) -> (Vec<ResultItem>, Option<Winner>) {
    let rows: Vec<ResultItem> = items
        .iter()
        .map(|item| ResultItem {
            id: item.id.clone(),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            vote_count: item.vote_count,
            percentage: percentage(item.vote_count, post_vote_count),
            avg_position: None,
            avg_scores: None,
            score_distribution: None,
        })
        .collect();

    // Strictly-greater comparison keeps the first item on ties.
    let winner = rows
        .iter()
        .fold(None::<&ResultItem>, |best, row| match best {
            Some(current) if row.vote_count <= current.vote_count => best,
            _ => Some(row),
        })
        .map(|row| Winner {
            item_id: row.id.clone(),
            name: row.name.clone(),
            avg_position: None,
            overall_score: None,
            percentage: Some(row.percentage),
        });

    (rows, winner)
}
