//! Ballot payload validation.
//!
//! A raw vote request carries optional fields whose meaning depends on the
//! post type. Validation happens in one place, at the entry of vote
//! submission, turning the raw payload into a typed [`Ballot`] — one variant
//! per post-type semantics — before anything is written.

use std::collections::{HashMap, HashSet};

use rateit_common::{AppError, AppResult};
use rateit_db::entities::{PostType, item};
use serde::Deserialize;

/// Raw vote request body, shape depending on the post type.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VotePayload {
    /// Selected item (poll, wyr, rate, single-item compare).
    pub item_id: Option<String>,
    /// Attribute → score 1..10 (rate, single-item compare).
    pub ratings: Option<HashMap<String, i32>>,
    /// Full finishing order of item IDs (rank).
    pub ranking: Option<Vec<String>>,
    /// Item → (attribute → score 1..10) (multi-item compare).
    pub multi_ratings: Option<HashMap<String, HashMap<String, i32>>>,
}

/// A validated ballot, ready for the vote transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ballot {
    /// One item picked (poll, wyr).
    Selection {
        /// Selected item ID.
        item_id: String,
    },
    /// One item rated on attributes (rate).
    Rating {
        /// Rated item ID.
        item_id: String,
        /// Attribute → score 1..10.
        ratings: HashMap<String, i32>,
    },
    /// Several items rated on shared attributes (compare). The single-item
    /// compare form normalizes into this with one entry. Entries follow the
    /// post's item display order.
    Comparison {
        /// Rated items with their attribute scores, in display order.
        entries: Vec<(String, HashMap<String, i32>)>,
    },
    /// Full finishing order of all items (rank).
    Ranking {
        /// Item IDs, index 0 = 1st place.
        ranking: Vec<String>,
    },
}

const SCORE_MIN: i32 = 1;
const SCORE_MAX: i32 = 10;

fn check_scores(ratings: &HashMap<String, i32>) -> AppResult<()> {
    if ratings
        .values()
        .any(|score| !(SCORE_MIN..=SCORE_MAX).contains(score))
    {
        return Err(AppError::InvalidVote(
            "Ratings must be between 1 and 10".to_string(),
        ));
    }
    Ok(())
}

fn check_membership(item_id: &str, known: &HashSet<&str>) -> AppResult<()> {
    if known.contains(item_id) {
        Ok(())
    } else {
        Err(AppError::InvalidVote(
            "Item does not belong to this post".to_string(),
        ))
    }
}

/// Validate a raw payload against the post type and the post's items.
pub fn validate(
    post_type: PostType,
    payload: VotePayload,
    items: &[item::Model],
) -> AppResult<Ballot> {
    let known: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();

    match post_type {
        PostType::Poll | PostType::WouldYouRather => {
            let item_id = payload
                .item_id
                .ok_or_else(|| AppError::InvalidVote("item_id required".to_string()))?;
            check_membership(&item_id, &known)?;
            Ok(Ballot::Selection { item_id })
        }

        PostType::Rate => {
            let (item_id, ratings) = required_rating(payload, "rate")?;
            check_membership(&item_id, &known)?;
            check_scores(&ratings)?;
            Ok(Ballot::Rating { item_id, ratings })
        }

        PostType::Compare => {
            if let Some(multi) = payload.multi_ratings.as_ref().filter(|m| !m.is_empty()) {
                for ratings in multi.values() {
                    check_scores(ratings)?;
                }
                // Entries for items not on this post are dropped without
                // error, tolerating stale client item lists.
                let entries: Vec<(String, HashMap<String, i32>)> = items
                    .iter()
                    .filter_map(|item| {
                        multi
                            .get(&item.id)
                            .map(|ratings| (item.id.clone(), ratings.clone()))
                    })
                    .collect();
                if entries.is_empty() {
                    return Err(AppError::InvalidVote(
                        "No rated item belongs to this post".to_string(),
                    ));
                }
                Ok(Ballot::Comparison { entries })
            } else {
                // Single-item form normalizes into the multi-item path.
                let (item_id, ratings) = required_rating(payload, "compare")?;
                check_membership(&item_id, &known)?;
                check_scores(&ratings)?;
                Ok(Ballot::Comparison {
                    entries: vec![(item_id, ratings)],
                })
            }
        }

        PostType::Rank => {
            let ranking = payload
                .ranking
                .filter(|r| !r.is_empty())
                .ok_or_else(|| AppError::InvalidVote("ranking required".to_string()))?;
            let distinct: HashSet<&str> = ranking.iter().map(String::as_str).collect();
            if ranking.len() != items.len()
                || distinct.len() != ranking.len()
                || distinct != known
            {
                return Err(AppError::InvalidVote(
                    "Ranking must order every item exactly once".to_string(),
                ));
            }
            Ok(Ballot::Ranking { ranking })
        }
    }
}

fn required_rating(
    payload: VotePayload,
    type_name: &str,
) -> AppResult<(String, HashMap<String, i32>)> {
    match (payload.item_id, payload.ratings.filter(|r| !r.is_empty())) {
        (Some(item_id), Some(ratings)) => Ok((item_id, ratings)),
        _ => Err(AppError::InvalidVote(format!(
            "item_id and ratings required for {type_name} posts"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, order_index: i32) -> item::Model {
        item::Model {
            id: id.to_string(),
            post_id: "p1".to_string(),
            name: format!("item {order_index}"),
            image_url: None,
            order_index,
            vote_count: 0,
            total_score: 0,
        }
    }

    fn items() -> Vec<item::Model> {
        vec![item("a", 0), item("b", 1), item("c", 2)]
    }

    fn ratings(pairs: &[(&str, i32)]) -> HashMap<String, i32> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn test_poll_requires_item_id() {
        let err = validate(PostType::Poll, VotePayload::default(), &items());
        assert!(matches!(err, Err(AppError::InvalidVote(_))));

        let ballot = validate(
            PostType::Poll,
            VotePayload {
                item_id: Some("b".to_string()),
                ..VotePayload::default()
            },
            &items(),
        );
        assert_eq!(
            ballot.ok(),
            Some(Ballot::Selection {
                item_id: "b".to_string()
            })
        );
    }

    #[test]
    fn test_poll_rejects_foreign_item() {
        let err = validate(
            PostType::Poll,
            VotePayload {
                item_id: Some("zz".to_string()),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));
    }

    #[test]
    fn test_rate_rejects_out_of_range_score() {
        for bad in [0, 11, -3] {
            let err = validate(
                PostType::Rate,
                VotePayload {
                    item_id: Some("a".to_string()),
                    ratings: Some(ratings(&[("quality", bad)])),
                    ..VotePayload::default()
                },
                &items(),
            );
            assert!(matches!(err, Err(AppError::InvalidVote(_))), "score {bad}");
        }
    }

    #[test]
    fn test_rate_accepts_boundary_scores() {
        let ballot = validate(
            PostType::Rate,
            VotePayload {
                item_id: Some("a".to_string()),
                ratings: Some(ratings(&[("quality", 1), ("value", 10)])),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(ballot.is_ok());
    }

    #[test]
    fn test_rate_requires_ratings() {
        let err = validate(
            PostType::Rate,
            VotePayload {
                item_id: Some("a".to_string()),
                ratings: Some(HashMap::new()),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));
    }

    #[test]
    fn test_compare_drops_foreign_entries() {
        let mut multi = HashMap::new();
        multi.insert("a".to_string(), ratings(&[("taste", 7)]));
        multi.insert("stale".to_string(), ratings(&[("taste", 9)]));

        let ballot = validate(
            PostType::Compare,
            VotePayload {
                multi_ratings: Some(multi),
                ..VotePayload::default()
            },
            &items(),
        );
        match ballot {
            Ok(Ballot::Comparison { entries }) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, "a");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_compare_all_foreign_is_invalid() {
        let mut multi = HashMap::new();
        multi.insert("stale".to_string(), ratings(&[("taste", 9)]));

        let err = validate(
            PostType::Compare,
            VotePayload {
                multi_ratings: Some(multi),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));
    }

    #[test]
    fn test_compare_validates_scores_before_dropping() {
        // An out-of-range score fails even on an entry that would be dropped
        let mut multi = HashMap::new();
        multi.insert("a".to_string(), ratings(&[("taste", 7)]));
        multi.insert("stale".to_string(), ratings(&[("taste", 42)]));

        let err = validate(
            PostType::Compare,
            VotePayload {
                multi_ratings: Some(multi),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));
    }

    #[test]
    fn test_compare_entries_follow_display_order() {
        let mut multi = HashMap::new();
        multi.insert("c".to_string(), ratings(&[("taste", 5)]));
        multi.insert("a".to_string(), ratings(&[("taste", 7)]));

        let ballot = validate(
            PostType::Compare,
            VotePayload {
                multi_ratings: Some(multi),
                ..VotePayload::default()
            },
            &items(),
        );
        match ballot {
            Ok(Ballot::Comparison { entries }) => {
                let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
                assert_eq!(ids, vec!["a", "c"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_compare_single_item_form_normalizes() {
        let ballot = validate(
            PostType::Compare,
            VotePayload {
                item_id: Some("b".to_string()),
                ratings: Some(ratings(&[("taste", 8)])),
                ..VotePayload::default()
            },
            &items(),
        );
        match ballot {
            Ok(Ballot::Comparison { entries }) => {
                assert_eq!(entries.len(), 1);
                assert_eq!(entries[0].0, "b");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_rank_requires_full_permutation() {
        // Missing an item
        let err = validate(
            PostType::Rank,
            VotePayload {
                ranking: Some(vec!["a".to_string(), "b".to_string()]),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));

        // Duplicate entry
        let err = validate(
            PostType::Rank,
            VotePayload {
                ranking: Some(vec!["a".to_string(), "a".to_string(), "b".to_string()]),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));

        // Foreign entry
        let err = validate(
            PostType::Rank,
            VotePayload {
                ranking: Some(vec!["a".to_string(), "b".to_string(), "zz".to_string()]),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(matches!(err, Err(AppError::InvalidVote(_))));

        // Exact permutation
        let ballot = validate(
            PostType::Rank,
            VotePayload {
                ranking: Some(vec!["c".to_string(), "a".to_string(), "b".to_string()]),
                ..VotePayload::default()
            },
            &items(),
        );
        assert!(ballot.is_ok());
    }
}
