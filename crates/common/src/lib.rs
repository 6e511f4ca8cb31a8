//! Common utilities and shared types for rateit.
//!
//! This crate provides foundational components used across all rateit crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based unique identifiers via [`IdGenerator`]
//! - **Identity resolution**: Anonymous voter identity via [`IdentityResolver`]
//!
//! # Example
//!
//! ```no_run
//! use rateit_common::{AppResult, Config, IdentityResolver};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let resolver = IdentityResolver::new(config.voting.hash_salt.clone());
//!     let identity = resolver.resolve("post-id", "203.0.113.7", None);
//!     println!("storage hash: {}", identity.storage_hash);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod identity;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use identity::{IdentityResolver, LookupStrategy, VoterIdentity};
