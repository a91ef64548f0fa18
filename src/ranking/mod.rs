//! # Merging and ranking
//!
//! The synchronous half of the pipeline. Both stages run on the
//! coordinating task after the fan-out has finished:
//!
//! - [`dedupe`] collapses records sharing a case-folded title, keeping the
//!   first one seen.
//! - [`rank`] scores titles against the keyword, sorts them stably by score
//!   and truncates to the requested count.

pub mod dedupe;
pub mod relevance;

pub use dedupe::dedupe;
pub use relevance::{rank, relevance_score, token_sort_key};
