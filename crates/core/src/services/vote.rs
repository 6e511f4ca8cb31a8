//! Vote service: the vote ledger.
//!
//! Enforces at-most-one-vote-per-identity-per-post and performs the atomic
//! vote-recording transaction. The idempotency pre-check runs before any
//! write; the lock table's composite key catches the race the pre-check
//! cannot.

use chrono::{DateTime, FixedOffset, Utc};
use rateit_common::{AppError, AppResult, IdGenerator, IdentityResolver};
use rateit_db::{
    entities::{post, vote, vote_lock},
    repositories::{ItemRepository, PostRepository, VoteRepository},
};
use sea_orm::Set;
use serde_json::json;

use crate::services::ballot::{self, Ballot, VotePayload};

/// Vote service for business logic.
#[derive(Clone)]
pub struct VoteService {
    post_repo: PostRepository,
    item_repo: ItemRepository,
    vote_repo: VoteRepository,
    resolver: IdentityResolver,
    id_gen: IdGenerator,
}

/// Result of a successful vote submission.
#[derive(Debug, Clone)]
pub struct VoteOutcome {
    /// Where the client should go next.
    pub redirect_to: String,
}

/// Answer to a vote-status check.
#[derive(Debug, Clone)]
pub struct VoteStatus {
    /// Whether this identity has voted on the post.
    pub has_voted: bool,
    /// When the vote was cast, if any.
    pub voted_at: Option<DateTime<FixedOffset>>,
}

impl VoteService {
    /// Create a new vote service.
    #[must_use]
    pub const fn new(
        post_repo: PostRepository,
        item_repo: ItemRepository,
        vote_repo: VoteRepository,
        resolver: IdentityResolver,
    ) -> Self {
        Self {
            post_repo,
            item_repo,
            vote_repo,
            resolver,
            id_gen: IdGenerator::new(),
        }
    }

    /// Submit one ballot on a post.
    ///
    /// Fails with [`AppError::AlreadyVoted`] when this identity has voted
    /// (including the concurrent-duplicate case), [`AppError::NotFound`] /
    /// [`AppError::Gone`] for missing, removed, or expired posts, and
    /// [`AppError::InvalidVote`] when the payload fails per-type validation.
    /// Nothing is written unless the whole ballot commits.
    pub async fn submit_vote(
        &self,
        post_id: &str,
        client_ip: &str,
        device_id: Option<&str>,
        payload: VotePayload,
    ) -> AppResult<VoteOutcome> {
        // Idempotency pre-check, before any write. Device identity is
        // checked against vote rows so a device is recognized across IP
        // changes; without one, fall back to the IP-only lock.
        if let Some(device) = device_id {
            if self
                .vote_repo
                .find_device_vote(post_id, device)
                .await?
                .is_some()
            {
                return Err(AppError::AlreadyVoted);
            }
        } else {
            let ip_hash = self.resolver.ip_hash(client_ip, post_id);
            if self.vote_repo.find_lock(&ip_hash, post_id).await?.is_some() {
                return Err(AppError::AlreadyVoted);
            }
        }

        let post = self.post_repo.get_by_id(post_id).await?;
        let now = Utc::now();
        check_votable(&post, now)?;

        let items = self.item_repo.find_by_post(post_id).await?;
        let ballot = ballot::validate(post.post_type, payload, &items)?;

        let identity = self.resolver.resolve(post_id, client_ip, device_id);

        let lock = vote_lock::ActiveModel {
            ip_hash: Set(identity.storage_hash.clone()),
            post_id: Set(post_id.to_string()),
            created_at: Set(now.into()),
        };
        let (votes, item_updates) =
            self.expand_ballot(ballot, post_id, &identity.storage_hash, device_id, now);

        self.vote_repo
            .record_ballot(lock, post_id, votes, &item_updates)
            .await?;

        tracing::debug!(post_id, "Ballot recorded");

        Ok(VoteOutcome {
            redirect_to: format!("/p/{post_id}/results"),
        })
    }

    /// Check whether this identity has voted on a post. Read-only.
    pub async fn check_vote_status(
        &self,
        post_id: &str,
        client_ip: &str,
        device_id: Option<&str>,
    ) -> AppResult<VoteStatus> {
        if let Some(device) = device_id {
            // A device identity that has no vote row has not voted,
            // regardless of what its IP may have done.
            let vote = self.vote_repo.find_device_vote(post_id, device).await?;
            return Ok(VoteStatus {
                has_voted: vote.is_some(),
                voted_at: vote.map(|v| v.created_at),
            });
        }

        let ip_hash = self.resolver.ip_hash(client_ip, post_id);
        let lock = self.vote_repo.find_lock(&ip_hash, post_id).await?;
        Ok(VoteStatus {
            has_voted: lock.is_some(),
            voted_at: lock.map(|l| l.created_at),
        })
    }

    /// Expand a validated ballot into vote rows and per-item counter deltas.
    fn expand_ballot(
        &self,
        ballot: Ballot,
        post_id: &str,
        storage_hash: &str,
        device_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> (Vec<vote::ActiveModel>, Vec<(String, i64)>) {
        let row = |item_id: Option<String>,
                   ratings: Option<serde_json::Value>,
                   ranking: Option<serde_json::Value>| {
            vote::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.to_string()),
                item_id: Set(item_id),
                ratings: Set(ratings),
                ranking: Set(ranking),
                ip_hash: Set(storage_hash.to_string()),
                browser_id: Set(device_id.map(ToString::to_string)),
                created_at: Set(now.into()),
            }
        };

        match ballot {
            Ballot::Selection { item_id } => {
                let votes = vec![row(Some(item_id.clone()), None, None)];
                (votes, vec![(item_id, 0)])
            }
            Ballot::Rating { item_id, ratings } => {
                let sum = i64::from(ratings.values().sum::<i32>());
                let votes = vec![row(Some(item_id.clone()), Some(json!(ratings)), None)];
                (votes, vec![(item_id, sum)])
            }
            Ballot::Comparison { entries } => {
                let mut votes = Vec::with_capacity(entries.len());
                let mut updates = Vec::with_capacity(entries.len());
                for (item_id, ratings) in entries {
                    let sum = i64::from(ratings.values().sum::<i32>());
                    votes.push(row(Some(item_id.clone()), Some(json!(ratings)), None));
                    updates.push((item_id, sum));
                }
                (votes, updates)
            }
            Ballot::Ranking { ranking } => {
                // No per-item counters; positions are aggregated at read time.
                let votes = vec![row(None, None, Some(json!(ranking)))];
                (votes, Vec::new())
            }
        }
    }
}

fn check_votable(post: &post::Model, now: DateTime<Utc>) -> AppResult<()> {
    if post.is_removed {
        return Err(AppError::Gone("Post has been removed".to_string()));
    }
    if post.expires_at.as_ref().is_some_and(|exp| *exp < now) {
        return Err(AppError::Gone("Post has expired".to_string()));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rateit_db::entities::{PostType, item};
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_post(post_type: PostType) -> post::Model {
        post::Model {
            id: "p1".to_string(),
            post_type,
            caption: None,
            attributes: None,
            vote_count: 0,
            comment_count: 0,
            report_count: 0,
            creator_token: "token".to_string(),
            browser_id: None,
            is_removed: false,
            expires_at: None,
            created_at: Utc::now().into(),
        }
    }

    fn test_item(id: &str, order_index: i32) -> item::Model {
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

    fn test_vote(id: &str) -> vote::Model {
        vote::Model {
            id: id.to_string(),
            post_id: "p1".to_string(),
            item_id: Some("i1".to_string()),
            ratings: None,
            ranking: None,
            ip_hash: "hash".to_string(),
            browser_id: Some("device-1".to_string()),
            created_at: Utc::now().into(),
        }
    }

    fn service(db: DatabaseConnection) -> VoteService {
        let db = Arc::new(db);
        VoteService::new(
            PostRepository::new(Arc::clone(&db)),
            ItemRepository::new(Arc::clone(&db)),
            VoteRepository::new(Arc::clone(&db)),
            IdentityResolver::new("test-salt"),
        )
    }

    #[tokio::test]
    async fn test_device_that_voted_is_rejected_before_any_write() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_vote("v1")]])
            .into_connection();

        let result = service(db)
            .submit_vote("p1", "203.0.113.7", Some("device-1"), VotePayload::default())
            .await;
        assert!(matches!(result, Err(AppError::AlreadyVoted)));
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([Vec::<post::Model>::new()])
            .into_connection();

        let result = service(db)
            .submit_vote("p1", "203.0.113.7", Some("device-1"), VotePayload::default())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_expired_post_is_gone() {
        let mut post = test_post(PostType::Poll);
        post.expires_at = Some((Utc::now() - Duration::hours(1)).into());

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([[post]])
            .into_connection();

        let result = service(db)
            .submit_vote(
                "p1",
                "203.0.113.7",
                Some("device-1"),
                VotePayload {
                    item_id: Some("i1".to_string()),
                    ..VotePayload::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Gone(_))));
    }

    #[tokio::test]
    async fn test_removed_post_is_gone() {
        let mut post = test_post(PostType::Poll);
        post.is_removed = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([[post]])
            .into_connection();

        let result = service(db)
            .submit_vote(
                "p1",
                "203.0.113.7",
                Some("device-1"),
                VotePayload {
                    item_id: Some("i1".to_string()),
                    ..VotePayload::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::Gone(_))));
    }

    #[tokio::test]
    async fn test_invalid_payload_is_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .append_query_results([[test_post(PostType::Poll)]])
            .append_query_results([[test_item("i1", 0), test_item("i2", 1)]])
            .into_connection();

        // Poll vote without an item_id
        let result = service(db)
            .submit_vote("p1", "203.0.113.7", Some("device-1"), VotePayload::default())
            .await;
        assert!(matches!(result, Err(AppError::InvalidVote(_))));
    }

    #[tokio::test]
    async fn test_check_vote_status_with_device_vote() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[test_vote("v1")]])
            .into_connection();

        let status = service(db)
            .check_vote_status("p1", "203.0.113.7", Some("device-1"))
            .await
            .unwrap();
        assert!(status.has_voted);
        assert!(status.voted_at.is_some());
    }

    #[tokio::test]
    async fn test_check_vote_status_device_without_vote() {
        // A device identity short-circuits: no vote row means not voted,
        // without falling back to the IP hash.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote::Model>::new()])
            .into_connection();

        let status = service(db)
            .check_vote_status("p1", "203.0.113.7", Some("device-1"))
            .await
            .unwrap();
        assert!(!status.has_voted);
        assert!(status.voted_at.is_none());
    }

    #[tokio::test]
    async fn test_check_vote_status_ip_fallback() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<vote_lock::Model>::new()])
            .into_connection();

        let status = service(db)
            .check_vote_status("p1", "203.0.113.7", None)
            .await
            .unwrap();
        assert!(!status.has_voted);
    }

    #[test]
    fn test_expand_rating_ballot_sums_scores() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);

        let mut ratings = std::collections::HashMap::new();
        ratings.insert("quality".to_string(), 8);
        ratings.insert("value".to_string(), 6);

        let (votes, updates) = svc.expand_ballot(
            Ballot::Rating {
                item_id: "i1".to_string(),
                ratings,
            },
            "p1",
            "hash",
            None,
            Utc::now(),
        );
        assert_eq!(votes.len(), 1);
        assert_eq!(updates, vec![("i1".to_string(), 14)]);
    }

    #[test]
    fn test_expand_ranking_ballot_touches_no_items() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);

        let (votes, updates) = svc.expand_ballot(
            Ballot::Ranking {
                ranking: vec!["a".to_string(), "b".to_string()],
            },
            "p1",
            "hash",
            None,
            Utc::now(),
        );
        assert_eq!(votes.len(), 1);
        assert!(updates.is_empty());
    }

    #[test]
    fn test_expand_comparison_ballot_writes_row_per_item() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);

        let mut taste = std::collections::HashMap::new();
        taste.insert("taste".to_string(), 7);
        let mut look = std::collections::HashMap::new();
        look.insert("taste".to_string(), 4);

        let (votes, updates) = svc.expand_ballot(
            Ballot::Comparison {
                entries: vec![("i1".to_string(), taste), ("i2".to_string(), look)],
            },
            "p1",
            "hash",
            Some("device-1"),
            Utc::now(),
        );
        assert_eq!(votes.len(), 2);
        assert_eq!(
            updates,
            vec![("i1".to_string(), 7), ("i2".to_string(), 4)]
        );
    }
}
