//! Post service.
//!
//! Post and item lifecycle: creation (atomic, item set fixed forever),
//! detail reads, soft removal, and the paged public feed with its three
//! ordering modes.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rateit_common::{AppError, AppResult, IdGenerator, IdentityResolver};
use rateit_db::{
    entities::{PostType, item, post},
    repositories::{ItemRepository, PostRepository, VoteRepository},
};
use sea_orm::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;
use serde_json::json;

use crate::services::results::attribute_means;
use crate::services::sanitize::sanitize_text;
use crate::services::trending::{self, FeedOrder};

const MAX_CAPTION_LEN: usize = 120;
const MAX_ITEM_NAME_LEN: usize = 50;
const MAX_ATTRIBUTES: usize = 5;
const DEFAULT_EXPIRES_IN_HOURS: i64 = 168;
const MAX_EXPIRES_IN_HOURS: i64 = 720;

/// Post service for business logic.
#[derive(Clone)]
pub struct PostService {
    post_repo: PostRepository,
    item_repo: ItemRepository,
    vote_repo: VoteRepository,
    resolver: IdentityResolver,
    id_gen: IdGenerator,
    share_base_url: String,
}

/// Input for creating a post.
#[derive(Debug, Clone)]
pub struct CreatePostInput {
    pub post_type: PostType,
    pub caption: Option<String>,
    /// Rating-dimension names, required for rate/compare posts.
    pub attributes: Option<Vec<String>>,
    pub items: Vec<CreateItemInput>,
    /// Direct expiry timestamp; takes precedence over `expires_in_hours`.
    pub expires_at: Option<DateTime<Utc>>,
    /// Hours until expiry (1..=720), defaulting to one week.
    pub expires_in_hours: Option<i64>,
}

/// One item of a post being created.
#[derive(Debug, Clone)]
pub struct CreateItemInput {
    pub name: String,
    pub image_url: Option<String>,
}

/// A freshly created post.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPost {
    pub id: String,
    pub share_url: String,
    /// Kept by the creator for legacy deletion.
    pub creator_token: String,
}

/// One item in a post detail or feed entry.
#[derive(Debug, Clone, Serialize)]
pub struct PostItem {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    pub vote_count: i32,
    /// Attribute → mean score, for rate/compare items with votes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_scores: Option<BTreeMap<String, f64>>,
}

/// Full post detail.
#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub caption: Option<String>,
    pub attributes: Option<Vec<String>>,
    pub items: Vec<PostItem>,
    pub vote_count: i32,
    pub comment_count: i32,
    pub has_voted: bool,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

/// One feed entry.
#[derive(Debug, Serialize)]
pub struct FeedPost {
    pub id: String,
    #[serde(rename = "type")]
    pub post_type: PostType,
    pub caption: Option<String>,
    pub items: Vec<PostItem>,
    pub vote_count: i32,
    pub comment_count: i32,
    pub has_voted: bool,
    pub expires_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
}

/// Pagination envelope.
#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub has_more: bool,
}

/// A page of the public feed.
#[derive(Debug, Serialize)]
pub struct FeedPage {
    pub posts: Vec<FeedPost>,
    pub pagination: Pagination,
}

impl PostService {
    /// Create a new post service.
    #[must_use]
    pub fn new(
        post_repo: PostRepository,
        item_repo: ItemRepository,
        vote_repo: VoteRepository,
        resolver: IdentityResolver,
        share_base_url: impl Into<String>,
    ) -> Self {
        Self {
            post_repo,
            item_repo,
            vote_repo,
            resolver,
            id_gen: IdGenerator::new(),
            share_base_url: share_base_url.into(),
        }
    }

    /// Create a post with its items, atomically.
    pub async fn create_post(
        &self,
        input: CreatePostInput,
        browser_id: Option<&str>,
    ) -> AppResult<CreatedPost> {
        let now = Utc::now();
        validate_item_count(input.post_type, input.items.len())?;

        let attributes = validate_attributes(input.post_type, input.attributes)?;

        let caption = match input.caption {
            Some(raw) => {
                if raw.len() > MAX_CAPTION_LEN {
                    return Err(AppError::InvalidInput(format!(
                        "Caption is too long (max {MAX_CAPTION_LEN} chars)"
                    )));
                }
                let clean = sanitize_text(&raw);
                (!clean.is_empty()).then_some(clean)
            }
            None => None,
        };

        let expires_at = resolve_expiry(input.expires_at, input.expires_in_hours, now)?;

        let post_id = self.id_gen.generate();
        let creator_token = self.id_gen.generate_token();

        let mut items = Vec::with_capacity(input.items.len());
        for (index, item_input) in input.items.into_iter().enumerate() {
            if item_input.name.len() > MAX_ITEM_NAME_LEN {
                return Err(AppError::InvalidInput(format!(
                    "Item name is too long (max {MAX_ITEM_NAME_LEN} chars)"
                )));
            }
            let name = sanitize_text(&item_input.name);
            if name.is_empty() {
                return Err(AppError::InvalidInput(
                    "Each item must have a name".to_string(),
                ));
            }
            items.push(item::ActiveModel {
                id: Set(self.id_gen.generate()),
                post_id: Set(post_id.clone()),
                name: Set(name),
                image_url: Set(item_input.image_url),
                order_index: Set(index as i32),
                vote_count: Set(0),
                total_score: Set(0),
            });
        }

        let model = post::ActiveModel {
            id: Set(post_id.clone()),
            post_type: Set(input.post_type),
            caption: Set(caption),
            attributes: Set(attributes.map(|attrs| json!(attrs))),
            vote_count: Set(0),
            comment_count: Set(0),
            report_count: Set(0),
            creator_token: Set(creator_token.clone()),
            browser_id: Set(browser_id.map(ToString::to_string)),
            is_removed: Set(false),
            expires_at: Set(expires_at.map(Into::into)),
            created_at: Set(now.into()),
        };

        let created = self.post_repo.create_with_items(model, items).await?;
        tracing::debug!(post_id = %created.id, post_type = ?created.post_type, "Post created");

        Ok(CreatedPost {
            share_url: format!("{}/p/{}", self.share_base_url.trim_end_matches('/'), created.id),
            id: created.id,
            creator_token,
        })
    }

    /// Get a visible post with its items and the caller's vote status.
    ///
    /// Removed posts read as absent; expired posts as gone.
    pub async fn get_post(
        &self,
        post_id: &str,
        client_ip: &str,
        device_id: Option<&str>,
    ) -> AppResult<PostDetail> {
        let post = self.post_repo.get_by_id(post_id).await?;
        if post.is_removed {
            return Err(AppError::NotFound(format!("Post not found: {post_id}")));
        }
        if post.expires_at.as_ref().is_some_and(|exp| *exp < Utc::now()) {
            return Err(AppError::Gone("Post has expired".to_string()));
        }

        let items = self.build_items(&post).await?;
        let has_voted = self.has_voted(post_id, client_ip, device_id).await?;

        let attributes = post
            .attributes
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| AppError::Internal(format!("Invalid stored attributes: {e}")))
            })
            .transpose()?;

        Ok(PostDetail {
            id: post.id,
            post_type: post.post_type,
            caption: post.caption,
            attributes,
            items,
            vote_count: post.vote_count,
            comment_count: post.comment_count,
            has_voted,
            expires_at: post.expires_at,
            created_at: post.created_at,
        })
    }

    /// Soft-remove a post.
    ///
    /// The creator's device identity wins; the creator token is the legacy
    /// fallback. Votes are never deleted.
    pub async fn delete_post(
        &self,
        post_id: &str,
        browser_id: Option<&str>,
        creator_token: Option<&str>,
    ) -> AppResult<()> {
        if let Some(browser) = browser_id
            && self.post_repo.soft_remove_by_browser(post_id, browser).await?
        {
            tracing::debug!(post_id, "Post removed by device identity");
            return Ok(());
        }

        if let Some(token) = creator_token
            && self.post_repo.soft_remove_by_token(post_id, token).await?
        {
            tracing::debug!(post_id, "Post removed by creator token");
            return Ok(());
        }

        Err(AppError::NotFound(
            "Post not found or unauthorized".to_string(),
        ))
    }

    /// List the public feed, paged.
    ///
    /// Trending order computes each post's recent-vote burst at query time;
    /// random order shuffles and is deliberately not reproducible.
    pub async fn list_posts(
        &self,
        order: FeedOrder,
        page: u64,
        limit: u64,
        client_ip: &str,
    ) -> AppResult<FeedPage> {
        let page = page.max(1);
        let limit = limit.clamp(1, 20);
        let now = Utc::now();

        // Already newest-first, which is both the `recent` order and the
        // tie-breaker for `trending` (the sort below is stable).
        let mut posts = self.post_repo.list_live(now).await?;
        let total = posts.len() as u64;

        match order {
            FeedOrder::Trending => {
                let since = trending::recent_window_start(now);
                let mut scored = Vec::with_capacity(posts.len());
                for post in posts {
                    let recent = self.vote_repo.count_recent(&post.id, since).await?;
                    let score = trending::trending_score(
                        post.vote_count,
                        post.comment_count,
                        post.created_at.with_timezone(&Utc),
                        recent,
                        now,
                    );
                    scored.push((post, score));
                }
                scored.sort_by(|a, b| {
                    b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal)
                });
                posts = scored.into_iter().map(|(post, _)| post).collect();
            }
            FeedOrder::Recent => {}
            FeedOrder::Random => {
                posts.shuffle(&mut rand::thread_rng());
            }
        }

        let offset = (page - 1) * limit;
        let page_posts: Vec<post::Model> = posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();

        let mut entries = Vec::with_capacity(page_posts.len());
        for post in page_posts {
            let items = self.build_items(&post).await?;
            // Feed listings predate device identities; the IP-only hash is
            // good enough for a hint flag here.
            let ip_hash = self.resolver.ip_hash(client_ip, &post.id);
            let has_voted = self.vote_repo.find_lock(&ip_hash, &post.id).await?.is_some();

            entries.push(FeedPost {
                id: post.id,
                post_type: post.post_type,
                caption: post.caption,
                items,
                vote_count: post.vote_count,
                comment_count: post.comment_count,
                has_voted,
                expires_at: post.expires_at,
                created_at: post.created_at,
            });
        }

        let returned = entries.len() as u64;
        Ok(FeedPage {
            posts: entries,
            pagination: Pagination {
                page,
                limit,
                total,
                has_more: offset + returned < total,
            },
        })
    }

    async fn build_items(&self, post: &post::Model) -> AppResult<Vec<PostItem>> {
        let items = self.item_repo.find_by_post(&post.id).await?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let avg_scores = if post.post_type.is_rated() && item.vote_count > 0 {
                let ratings = self.load_item_ratings(&item.id).await?;
                (!ratings.is_empty()).then(|| attribute_means(&ratings))
            } else {
                None
            };
            out.push(PostItem {
                id: item.id,
                name: item.name,
                image_url: item.image_url,
                vote_count: item.vote_count,
                avg_scores,
            });
        }
        Ok(out)
    }

    async fn load_item_ratings(
        &self,
        item_id: &str,
    ) -> AppResult<Vec<std::collections::HashMap<String, i32>>> {
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

    async fn has_voted(
        &self,
        post_id: &str,
        client_ip: &str,
        device_id: Option<&str>,
    ) -> AppResult<bool> {
        if let Some(device) = device_id {
            return Ok(self
                .vote_repo
                .find_device_vote(post_id, device)
                .await?
                .is_some());
        }
        let ip_hash = self.resolver.ip_hash(client_ip, post_id);
        Ok(self.vote_repo.find_lock(&ip_hash, post_id).await?.is_some())
    }
}

fn validate_item_count(post_type: PostType, count: usize) -> AppResult<()> {
    let valid = match post_type {
        PostType::WouldYouRather => count == 2,
        PostType::Poll | PostType::Rank | PostType::Compare => (2..=4).contains(&count),
        PostType::Rate => count == 1,
    };
    if valid {
        Ok(())
    } else {
        let requirement = match post_type {
            PostType::WouldYouRather => "exactly 2 items",
            PostType::Poll | PostType::Rank | PostType::Compare => "2-4 items",
            PostType::Rate => "exactly 1 item",
        };
        Err(AppError::InvalidInput(format!(
            "This post type requires {requirement}"
        )))
    }
}

fn validate_attributes(
    post_type: PostType,
    attributes: Option<Vec<String>>,
) -> AppResult<Option<Vec<String>>> {
    if !post_type.is_rated() {
        return Ok(None);
    }
    let attrs = attributes.unwrap_or_default();
    if attrs.is_empty() {
        return Err(AppError::InvalidInput(
            "Rated post types require at least one attribute".to_string(),
        ));
    }
    if attrs.len() > MAX_ATTRIBUTES {
        return Err(AppError::InvalidInput(format!(
            "At most {MAX_ATTRIBUTES} attributes are allowed"
        )));
    }
    Ok(Some(attrs))
}

fn resolve_expiry(
    expires_at: Option<DateTime<Utc>>,
    expires_in_hours: Option<i64>,
    now: DateTime<Utc>,
) -> AppResult<Option<DateTime<Utc>>> {
    let resolved = if let Some(at) = expires_at {
        at
    } else {
        let hours = expires_in_hours.unwrap_or(DEFAULT_EXPIRES_IN_HOURS);
        if !(1..=MAX_EXPIRES_IN_HOURS).contains(&hours) {
            return Err(AppError::InvalidInput(format!(
                "expires_in_hours must be between 1 and {MAX_EXPIRES_IN_HOURS}"
            )));
        }
        now + Duration::hours(hours)
    };

    if resolved <= now {
        return Err(AppError::InvalidInput(
            "Expiration time must be in the future".to_string(),
        ));
    }
    Ok(Some(resolved))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> PostService {
        let db = Arc::new(db);
        PostService::new(
            PostRepository::new(Arc::clone(&db)),
            ItemRepository::new(Arc::clone(&db)),
            VoteRepository::new(Arc::clone(&db)),
            IdentityResolver::new("test-salt"),
            "https://rateit.example",
        )
    }

    fn input(post_type: PostType, item_names: &[&str]) -> CreatePostInput {
        CreatePostInput {
            post_type,
            caption: Some("caption".to_string()),
            attributes: None,
            items: item_names
                .iter()
                .map(|name| CreateItemInput {
                    name: (*name).to_string(),
                    image_url: None,
                })
                .collect(),
            expires_at: None,
            expires_in_hours: None,
        }
    }

    #[test]
    fn test_item_count_rules() {
        assert!(validate_item_count(PostType::WouldYouRather, 2).is_ok());
        assert!(validate_item_count(PostType::WouldYouRather, 3).is_err());
        assert!(validate_item_count(PostType::Poll, 2).is_ok());
        assert!(validate_item_count(PostType::Poll, 4).is_ok());
        assert!(validate_item_count(PostType::Poll, 1).is_err());
        assert!(validate_item_count(PostType::Poll, 5).is_err());
        assert!(validate_item_count(PostType::Rate, 1).is_ok());
        assert!(validate_item_count(PostType::Rate, 2).is_err());
        assert!(validate_item_count(PostType::Rank, 3).is_ok());
        assert!(validate_item_count(PostType::Compare, 4).is_ok());
    }

    #[test]
    fn test_rated_types_require_attributes() {
        assert!(matches!(
            validate_attributes(PostType::Rate, None),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            validate_attributes(PostType::Compare, Some(vec![])),
            Err(AppError::InvalidInput(_))
        ));
        assert!(
            validate_attributes(PostType::Rate, Some(vec!["quality".to_string()]))
                .unwrap()
                .is_some()
        );
        // Non-rated types never store attributes
        assert!(
            validate_attributes(PostType::Poll, Some(vec!["quality".to_string()]))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_expiry_must_be_future() {
        let now = Utc::now();
        assert!(matches!(
            resolve_expiry(Some(now - Duration::hours(1)), None, now),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_expiry(None, Some(0), now),
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            resolve_expiry(None, Some(9999), now),
            Err(AppError::InvalidInput(_))
        ));

        // Default expiry is a week out
        let resolved = resolve_expiry(None, None, now).unwrap().unwrap();
        assert_eq!(resolved, now + Duration::hours(168));
    }

    #[tokio::test]
    async fn test_create_post_rejects_wrong_item_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db)
            .create_post(input(PostType::WouldYouRather, &["a", "b", "c"]), None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_post_rejects_empty_item_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db)
            .create_post(input(PostType::Poll, &["ok", "<b></b>"]), None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_create_rate_post_without_attributes_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db)
            .create_post(input(PostType::Rate, &["only"]), None)
            .await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }
}
