//! Shared application state.

use rateit_core::{PostService, ResultsService, VoteService};

/// Application state handed to every endpoint.
#[derive(Clone)]
pub struct AppState {
    /// Post lifecycle and feed.
    pub post_service: PostService,
    /// Vote ledger.
    pub vote_service: VoteService,
    /// Results aggregation.
    pub results_service: ResultsService,
}
