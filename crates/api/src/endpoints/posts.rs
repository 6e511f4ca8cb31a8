//! Post endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use chrono::{DateTime, Utc};
use rateit_common::AppResult;
use rateit_core::{CreateItemInput, CreatePostInput, CreatedPost, FeedOrder, FeedPage, PostDetail};
use rateit_db::entities::PostType;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    extractors::{BrowserId, ClientIp},
    response::{self, ApiResponse},
    state::AppState,
};

/// Create post request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(rename = "type")]
    pub post_type: PostType,
    #[validate(length(max = 120))]
    pub caption: Option<String>,
    #[validate(length(max = 5))]
    pub attributes: Option<Vec<String>>,
    #[validate(length(min = 1, max = 4))]
    pub items: Vec<CreateItemRequest>,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in_hours: Option<i64>,
}

/// One item of a create post request.
#[derive(Debug, Deserialize, Serialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub image_url: Option<String>,
}

/// Create a post.
async fn create_post(
    BrowserId(browser_id): BrowserId,
    State(state): State<AppState>,
    Json(req): Json<CreatePostRequest>,
) -> AppResult<ApiResponse<CreatedPost>> {
    req.validate()?;

    let input = CreatePostInput {
        post_type: req.post_type,
        caption: req.caption,
        attributes: req.attributes,
        items: req
            .items
            .into_iter()
            .map(|item| CreateItemInput {
                name: item.name,
                image_url: item.image_url,
            })
            .collect(),
        expires_at: req.expires_at,
        expires_in_hours: req.expires_in_hours,
    };

    let created = state
        .post_service
        .create_post(input, browser_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(created))
}

/// Feed listing query.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    #[serde(rename = "type", default)]
    pub order: FeedOrder,
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

const fn default_page() -> u64 {
    1
}

const fn default_limit() -> u64 {
    10
}

/// List the public feed.
async fn list_posts(
    ClientIp(client_ip): ClientIp,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> AppResult<ApiResponse<FeedPage>> {
    let page = state
        .post_service
        .list_posts(query.order, query.page, query.limit, &client_ip)
        .await?;
    Ok(ApiResponse::ok(page))
}

/// Get one post with the caller's vote status.
async fn get_post(
    Path(post_id): Path<String>,
    ClientIp(client_ip): ClientIp,
    BrowserId(browser_id): BrowserId,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<PostDetail>> {
    let detail = state
        .post_service
        .get_post(&post_id, &client_ip, browser_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(detail))
}

/// Delete query (legacy creator-token deletion).
#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    pub creator_token: Option<String>,
}

/// Soft-remove a post.
async fn delete_post(
    Path(post_id): Path<String>,
    BrowserId(browser_id): BrowserId,
    State(state): State<AppState>,
    Query(query): Query<DeleteQuery>,
) -> AppResult<impl axum::response::IntoResponse> {
    state
        .post_service
        .delete_post(&post_id, browser_id.as_deref(), query.creator_token.as_deref())
        .await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).delete(delete_post))
}
