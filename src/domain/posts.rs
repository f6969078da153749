//! Scraped post records and the collection document they arrive in.

use serde::{Deserialize, Deserializer, Serialize};

/// One scraped community item.
///
/// `url` is the identity of a post: two records with the same `url` describe
/// the same post regardless of which collection run produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub site: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
    #[serde(default)]
    pub comments: Option<u64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub collected_at: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

impl Post {
    /// Thumbnail URL when present and non-blank.
    pub fn thumbnail_url(&self) -> Option<&str> {
        self.thumbnail
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

/// Batch-level metadata accompanying a post collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    #[serde(default)]
    pub total_posts: usize,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub collected_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sites: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
}

/// The full upstream document. Immutable once fetched; a refresh replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCollection {
    pub posts: Vec<Post>,
    #[serde(default)]
    pub metadata: CollectionMetadata,
}

impl PostCollection {
    pub fn new(posts: Vec<Post>, metadata: CollectionMetadata) -> Self {
        Self { posts, metadata }
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.url == url)
    }

    /// Distinct site codes in order of first appearance.
    pub fn site_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for post in &self.posts {
            if !codes.iter().any(|code| code == &post.site) {
                codes.push(post.site.clone());
            }
        }
        codes
    }

    pub fn posts_for_site<'a>(&'a self, site: &'a str) -> impl Iterator<Item = &'a Post> + 'a {
        self.posts.iter().filter(move |post| post.site == site)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_counters_stay_unknown() {
        let json = r#"{
            "posts": [
                {"site": "clien", "title": "hello", "url": "https://www.clien.net/1",
                 "views": 12, "likes": null, "collected_at": "2025-01-02T03:04:05"}
            ],
            "metadata": {"total_posts": 1, "collected_at": "2025-01-02T03:04:05", "sites": ["clien"]}
        }"#;

        let collection: PostCollection = serde_json::from_str(json).expect("valid document");
        let post = &collection.posts[0];

        assert_eq!(post.views, Some(12));
        assert_eq!(post.likes, None);
        assert_eq!(post.comments, None);
        assert_eq!(post.author, None);
        assert_eq!(collection.metadata.sites.as_deref(), Some(&["clien".to_string()][..]));
    }

    #[test]
    fn null_collected_at_becomes_empty() {
        let json = r#"{"posts": [{"site": "a", "title": "t", "url": "u", "collected_at": null}]}"#;
        let collection: PostCollection = serde_json::from_str(json).expect("valid document");

        assert_eq!(collection.posts[0].collected_at, "");
        assert_eq!(collection.metadata, CollectionMetadata::default());
    }

    #[test]
    fn site_codes_follow_first_appearance() {
        let post = |site: &str, url: &str| Post {
            site: site.to_string(),
            title: String::new(),
            url: url.to_string(),
            author: None,
            timestamp: None,
            views: None,
            likes: None,
            comments: None,
            collected_at: String::new(),
            thumbnail: None,
        };
        let collection = PostCollection::new(
            vec![post("b", "1"), post("a", "2"), post("b", "3")],
            CollectionMetadata::default(),
        );

        assert_eq!(collection.site_codes(), vec!["b", "a"]);
        assert_eq!(collection.find_by_url("2").map(|p| p.site.as_str()), Some("a"));
        assert_eq!(collection.posts_for_site("b").count(), 2);
    }

    #[test]
    fn blank_thumbnail_is_ignored() {
        let json = r#"{"site": "a", "title": "t", "url": "u", "thumbnail": "  "}"#;
        let post: Post = serde_json::from_str(json).expect("valid post");
        assert_eq!(post.thumbnail_url(), None);
    }
}
