//! Business logic services.

#![allow(missing_docs)]

pub mod ballot;
pub mod post;
pub mod results;
pub mod sanitize;
pub mod trending;
pub mod vote;

pub use ballot::{Ballot, VotePayload};
pub use post::{
    CreateItemInput, CreatePostInput, CreatedPost, FeedPage, FeedPost, Pagination, PostDetail,
    PostItem, PostService,
};
pub use results::{PostResults, PostSummary, ResultItem, ResultsBody, ResultsService, Winner};
pub use sanitize::sanitize_text;
pub use trending::{FeedOrder, trending_score};
pub use vote::{VoteOutcome, VoteService, VoteStatus};
