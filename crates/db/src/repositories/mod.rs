//! Database repositories.

#![allow(missing_docs)]

pub mod item;
pub mod post;
pub mod vote;

pub use item::ItemRepository;
pub use post::PostRepository;
pub use vote::VoteRepository;
