//! Feed composition, ranking and route metadata.

pub mod error;
pub mod feed;
pub mod metadata;
pub mod pagination;
pub mod post_id;
pub mod ranking;
pub mod repos;
