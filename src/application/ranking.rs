//! Ordering of posts for the feed.
//!
//! All functions here are pure: they never mutate their input and the sort
//! they perform is stable, so equal keys keep the order they arrived in.

use std::{cmp::Reverse, collections::HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::posts::Post;

const VIEWS_WEIGHT: f64 = 0.3;
const LIKES_WEIGHT: f64 = 0.5;
const COMMENTS_WEIGHT: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    Latest,
    Popular,
    Likes,
    Comments,
}

impl SortMode {
    pub fn as_str(self) -> &'static str {
        match self {
            SortMode::Latest => "latest",
            SortMode::Popular => "popular",
            SortMode::Likes => "likes",
            SortMode::Comments => "comments",
        }
    }

    /// Parses a client-supplied sort key; anything unrecognised becomes `latest`.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "popular" => SortMode::Popular,
            "likes" => SortMode::Likes,
            "comments" => SortMode::Comments,
            _ => SortMode::Latest,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MetricRange {
    min: f64,
    max: f64,
}

impl MetricRange {
    fn of(values: impl Iterator<Item = f64>) -> Self {
        values.fold(
            MetricRange {
                min: f64::INFINITY,
                max: f64::NEG_INFINITY,
            },
            |range, value| MetricRange {
                min: range.min.min(value),
                max: range.max.max(value),
            },
        )
    }

    /// Maps `value` into `[0, 1]`. A zero-width range maps everything to 0.
    fn normalize(self, value: f64) -> f64 {
        let span = self.max - self.min;
        let denominator = if span == 0.0 { 1.0 } else { span };
        (value - self.min) / denominator
    }
}

#[derive(Debug, Clone, Copy)]
struct SiteRanges {
    views: MetricRange,
    likes: MetricRange,
    comments: MetricRange,
}

fn metric(value: Option<u64>) -> f64 {
    value.unwrap_or(0) as f64
}

/// Popularity score for every post, aligned with `posts`.
///
/// Each metric is min-max normalised within the post's own site, so a busy
/// community cannot drown out a quiet one.
pub fn popularity_scores(posts: &[Post]) -> Vec<f64> {
    let mut by_site: HashMap<&str, Vec<&Post>> = HashMap::new();
    for post in posts {
        by_site.entry(post.site.as_str()).or_default().push(post);
    }

    let ranges: HashMap<&str, SiteRanges> = by_site
        .into_iter()
        .map(|(site, members)| {
            let ranges = SiteRanges {
                views: MetricRange::of(members.iter().map(|post| metric(post.views))),
                likes: MetricRange::of(members.iter().map(|post| metric(post.likes))),
                comments: MetricRange::of(members.iter().map(|post| metric(post.comments))),
            };
            (site, ranges)
        })
        .collect();

    posts
        .iter()
        .map(|post| {
            let Some(range) = ranges.get(post.site.as_str()) else {
                return 0.0;
            };
            VIEWS_WEIGHT * range.views.normalize(metric(post.views))
                + LIKES_WEIGHT * range.likes.normalize(metric(post.likes))
                + COMMENTS_WEIGHT * range.comments.normalize(metric(post.comments))
        })
        .collect()
}

/// Returns a new, ordered copy of `posts`.
pub fn rank(posts: &[Post], mode: SortMode) -> Vec<Post> {
    match mode {
        SortMode::Latest => {
            let mut ranked = posts.to_vec();
            // Empty strings compare lowest, so unknown collection times land last.
            ranked.sort_by(|a, b| b.collected_at.cmp(&a.collected_at));
            ranked
        }
        SortMode::Likes => {
            let mut ranked = posts.to_vec();
            ranked.sort_by_key(|post| Reverse(post.likes.unwrap_or(0)));
            ranked
        }
        SortMode::Comments => {
            let mut ranked = posts.to_vec();
            ranked.sort_by_key(|post| Reverse(post.comments.unwrap_or(0)));
            ranked
        }
        SortMode::Popular => {
            let scores = popularity_scores(posts);
            let mut scored: Vec<(f64, &Post)> = scores.into_iter().zip(posts.iter()).collect();
            scored.sort_by(|(a, _), (b, _)| b.total_cmp(a));
            scored.into_iter().map(|(_, post)| post.clone()).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(site: &str, url: &str, views: u64, likes: u64, comments: u64) -> Post {
        Post {
            site: site.to_string(),
            title: url.to_string(),
            url: url.to_string(),
            author: None,
            timestamp: None,
            views: Some(views),
            likes: Some(likes),
            comments: Some(comments),
            collected_at: String::new(),
            thumbnail: None,
        }
    }

    fn urls(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|post| post.url.as_str()).collect()
    }

    #[test]
    fn uniform_site_scores_zero() {
        let posts = vec![post("a", "1", 7, 7, 7), post("a", "2", 7, 7, 7)];
        let scores = popularity_scores(&posts);

        assert_eq!(scores, vec![0.0, 0.0]);
        assert!(scores.iter().all(|score| !score.is_nan()));
    }

    #[test]
    fn popular_orders_by_normalised_score() {
        let posts = vec![post("a", "post1", 10, 5, 1), post("a", "post2", 20, 10, 5)];

        let scores = popularity_scores(&posts);
        assert!(scores[0].abs() < 1e-9);
        assert!((scores[1] - 1.0).abs() < 1e-9);

        let ranked = rank(&posts, SortMode::Popular);
        assert_eq!(urls(&ranked), vec!["post2", "post1"]);
    }

    #[test]
    fn popular_normalises_within_each_site() {
        // Site `b` has tiny absolute numbers but its top post still scores 1.
        let posts = vec![
            post("a", "a-low", 1_000, 100, 10),
            post("a", "a-high", 9_000, 900, 90),
            post("b", "b-low", 1, 0, 0),
            post("b", "b-high", 3, 2, 1),
        ];

        let scores = popularity_scores(&posts);
        assert!((scores[1] - 1.0).abs() < 1e-9);
        assert!((scores[3] - 1.0).abs() < 1e-9);

        let ranked = rank(&posts, SortMode::Popular);
        assert_eq!(urls(&ranked), vec!["a-high", "b-high", "a-low", "b-low"]);
    }

    #[test]
    fn popular_ties_keep_input_order() {
        let posts = vec![
            post("a", "first", 5, 5, 5),
            post("b", "second", 1, 1, 1),
            post("c", "third", 9, 9, 9),
        ];

        let ranked = rank(&posts, SortMode::Popular);
        assert_eq!(urls(&ranked), vec!["first", "second", "third"]);
    }

    #[test]
    fn latest_sorts_descending_and_puts_unknown_last() {
        let mut old = post("a", "old", 0, 0, 0);
        old.collected_at = "2025-01-01T00:00:00".to_string();
        let mut new = post("a", "new", 0, 0, 0);
        new.collected_at = "2025-02-01T00:00:00".to_string();
        let unknown = post("a", "unknown", 0, 0, 0);

        let ranked = rank(&[unknown, old, new], SortMode::Latest);
        assert_eq!(urls(&ranked), vec!["new", "old", "unknown"]);
    }

    #[test]
    fn likes_treats_missing_as_zero() {
        let mut missing = post("a", "missing", 0, 0, 0);
        missing.likes = None;
        let ranked = rank(
            &[missing, post("a", "one", 0, 1, 0), post("a", "zero", 0, 0, 0)],
            SortMode::Likes,
        );

        assert_eq!(urls(&ranked), vec!["one", "missing", "zero"]);
    }

    #[test]
    fn comments_sorts_descending() {
        let ranked = rank(
            &[post("a", "few", 0, 0, 1), post("b", "many", 0, 0, 9)],
            SortMode::Comments,
        );
        assert_eq!(urls(&ranked), vec!["many", "few"]);
    }

    #[test]
    fn rank_leaves_input_untouched() {
        let posts = vec![post("a", "1", 1, 1, 1), post("a", "2", 2, 2, 2)];
        let before = posts.clone();
        let _ = rank(&posts, SortMode::Popular);
        assert_eq!(posts, before);
    }

    #[test]
    fn sort_mode_parsing_falls_back_to_latest() {
        assert_eq!(SortMode::parse("popular"), SortMode::Popular);
        assert_eq!(SortMode::parse("comments"), SortMode::Comments);
        assert_eq!(SortMode::parse("bogus"), SortMode::Latest);
        assert_eq!(SortMode::parse(""), SortMode::Latest);
        assert_eq!(SortMode::Likes.as_str(), "likes");
    }
}
