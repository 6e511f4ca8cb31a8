//! API endpoints.

mod posts;
mod results;
mod votes;

use axum::Router;

use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/posts",
        posts::router()
            .merge(votes::router())
            .merge(results::router()),
    )
}
