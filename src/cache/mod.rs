//! Process-wide cache of the upstream post collection.
//!
//! The store keeps the last successfully fetched collection for a
//! configurable TTL and degrades to that stale copy when a refresh fails.

mod post_store;

pub use post_store::{DEFAULT_TTL, PostStore};
