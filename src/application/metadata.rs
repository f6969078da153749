//! Per-route document metadata for crawlers and link previews.
//!
//! The resolver maps a request path to the title, description, Open Graph
//! fields and JSON-LD the edge layer splices into the SPA shell. Resolution
//! never fails: anything that cannot be resolved precisely falls back to the
//! site-wide defaults.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::application::post_id;
use crate::cache::PostStore;
use crate::config::SiteSettings;
use crate::domain::{posts::Post, sites};

pub const META_START_MARKER: &str = "<!--BUZZIT_META_START-->";
pub const META_END_MARKER: &str = "<!--BUZZIT_META_END-->";

/// Branding and defaults every metadata record is built from.
#[derive(Debug, Clone)]
pub struct SiteIdentity {
    pub brand: String,
    pub public_url: String,
    pub description: String,
    pub default_image: String,
}

impl SiteIdentity {
    pub fn from_settings(settings: &SiteSettings) -> Self {
        Self {
            brand: settings.brand.clone(),
            public_url: settings.public_url.trim_end_matches('/').to_string(),
            description: settings.description.clone(),
            default_image: settings.default_image.clone(),
        }
    }

    pub fn canonical(&self, path: &str) -> String {
        if path.is_empty() || path == "/" {
            return format!("{}/", self.public_url);
        }
        format!("{}{}", self.public_url, path)
    }

    fn publisher(&self) -> Value {
        json!({
            "@type": "Organization",
            "name": self.brand,
            "url": self.canonical("/"),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TwitterCard {
    Summary,
    SummaryLargeImage,
}

impl TwitterCard {
    pub fn as_str(self) -> &'static str {
        match self {
            TwitterCard::Summary => "summary",
            TwitterCard::SummaryLargeImage => "summary_large_image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metadata {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub og_type: &'static str,
    pub og_image: String,
    pub twitter_card: TwitterCard,
    pub structured_data: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Post(String),
    Site(String),
    About,
    Privacy,
    Terms,
    Default,
}

impl Route {
    /// Classifies a request path. Query strings are ignored and a trailing
    /// slash is tolerated.
    pub fn classify(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed
            .trim_start_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .collect();

        match segments.as_slice() {
            ["post", token] => Route::Post((*token).to_string()),
            ["site", code] => Route::Site(
                urlencoding::decode(code)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| (*code).to_string()),
            ),
            ["about"] => Route::About,
            ["privacy"] => Route::Privacy,
            ["terms"] => Route::Terms,
            _ => Route::Default,
        }
    }
}

#[derive(Clone)]
pub struct MetadataResolver {
    store: Arc<PostStore>,
    identity: Arc<SiteIdentity>,
}

impl MetadataResolver {
    pub fn new(store: Arc<PostStore>, identity: SiteIdentity) -> Self {
        Self {
            store,
            identity: Arc::new(identity),
        }
    }

    pub fn identity(&self) -> &SiteIdentity {
        &self.identity
    }

    pub async fn resolve(&self, path: &str) -> Metadata {
        let canonical_path = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        match Route::classify(path) {
            Route::Post(token) => match self.find_post(&token).await {
                Some(post) => post_metadata(&self.identity, &post, canonical_path),
                None => default_metadata(&self.identity),
            },
            Route::Site(code) => site_metadata(&self.identity, &code, canonical_path),
            Route::About => static_metadata(
                &self.identity,
                "서비스 소개",
                format!(
                    "{}는 여러 커뮤니티의 인기 게시글을 한곳에 모아 보여주는 서비스입니다.",
                    self.identity.brand
                ),
                canonical_path,
            ),
            Route::Privacy => static_metadata(
                &self.identity,
                "개인정보처리방침",
                format!("{} 개인정보처리방침 안내입니다.", self.identity.brand),
                canonical_path,
            ),
            Route::Terms => static_metadata(
                &self.identity,
                "이용약관",
                format!("{} 서비스 이용약관입니다.", self.identity.brand),
                canonical_path,
            ),
            Route::Default => default_metadata(&self.identity),
        }
    }

    async fn find_post(&self, token: &str) -> Option<Post> {
        let url = match post_id::decode(token) {
            Ok(url) => url,
            Err(err) => {
                debug!(
                    target = "buzzit::metadata",
                    token,
                    error = %err,
                    "post token could not be decoded"
                );
                return None;
            }
        };

        let collection = match self.store.load().await {
            Ok(collection) => collection,
            Err(err) => {
                warn!(
                    target = "buzzit::metadata",
                    error = %err,
                    "post collection unavailable; using default metadata"
                );
                return None;
            }
        };

        let found = collection.find_by_url(&url).cloned();
        if found.is_none() {
            debug!(target = "buzzit::metadata", url = %url, "post not in current collection");
        }
        found
    }
}

pub fn default_metadata(identity: &SiteIdentity) -> Metadata {
    let canonical = identity.canonical("/");
    Metadata {
        title: format!("{} - 커뮤니티 인기글 모음", identity.brand),
        description: identity.description.clone(),
        structured_data: json!({
            "@context": "https://schema.org",
            "@type": "WebSite",
            "name": identity.brand,
            "url": canonical,
            "description": identity.description,
        }),
        canonical,
        og_type: "website",
        og_image: identity.default_image.clone(),
        twitter_card: TwitterCard::Summary,
    }
}

fn post_metadata(identity: &SiteIdentity, post: &Post, path: &str) -> Metadata {
    let site_name = sites::display_name(&post.site);
    let canonical = identity.canonical(path);
    let (og_image, twitter_card) = match post.thumbnail_url() {
        Some(thumbnail) => (thumbnail.to_string(), TwitterCard::SummaryLargeImage),
        None => (identity.default_image.clone(), TwitterCard::Summary),
    };

    let mut article = json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": post.title,
        "url": canonical,
        "isBasedOn": post.url,
        "image": og_image,
        "publisher": identity.publisher(),
        "isPartOf": {
            "@type": "CollectionPage",
            "name": site_name,
            "url": identity.canonical(&format!("/site/{}", post.site)),
        },
    });
    if let Some(author) = post.author.as_deref().filter(|name| !name.trim().is_empty()) {
        article["author"] = json!({ "@type": "Person", "name": author });
    }
    if !post.collected_at.is_empty() {
        article["dateModified"] = json!(post.collected_at);
    }

    Metadata {
        title: format!("{} - {} | {}", post.title, site_name, identity.brand),
        description: format!("{site_name} 인기 게시글: {}", post.title),
        canonical,
        og_type: "article",
        og_image,
        twitter_card,
        structured_data: article,
    }
}

fn site_metadata(identity: &SiteIdentity, code: &str, path: &str) -> Metadata {
    let site_name = sites::display_name(code);
    let canonical = identity.canonical(path);
    let title = format!("{site_name} 인기 게시글 | {}", identity.brand);
    let description = format!("{site_name}의 최신 인기 게시글을 {}에서 모아 보세요.", identity.brand);

    Metadata {
        structured_data: json!({
            "@context": "https://schema.org",
            "@type": "CollectionPage",
            "name": title,
            "url": canonical,
            "description": description,
            "isPartOf": { "@type": "WebSite", "name": identity.brand, "url": identity.canonical("/") },
        }),
        title,
        description,
        canonical,
        og_type: "website",
        og_image: identity.default_image.clone(),
        twitter_card: TwitterCard::Summary,
    }
}

fn static_metadata(identity: &SiteIdentity, heading: &str, description: String, path: &str) -> Metadata {
    let canonical = identity.canonical(path);
    let title = format!("{heading} | {}", identity.brand);

    Metadata {
        structured_data: json!({
            "@context": "https://schema.org",
            "@type": "WebPage",
            "name": title,
            "url": canonical,
            "description": description,
        }),
        title,
        description,
        canonical,
        og_type: "website",
        og_image: identity.default_image.clone(),
        twitter_card: TwitterCard::Summary,
    }
}

/// Replaces the text between the metadata markers, keeping both markers.
///
/// Returns `None` when either marker is missing.
pub fn splice(document: &str, markup: &str) -> Option<String> {
    let start = document.find(META_START_MARKER)?;
    let content_start = start + META_START_MARKER.len();
    let end = content_start + document[content_start..].find(META_END_MARKER)?;

    let mut spliced = String::with_capacity(document.len() + markup.len());
    spliced.push_str(&document[..content_start]);
    spliced.push_str(markup);
    spliced.push_str(&document[end..]);
    Some(spliced)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::repos::{FetchError, PostSource};
    use crate::domain::posts::{CollectionMetadata, PostCollection};

    struct FixedSource(Option<PostCollection>);

    #[async_trait]
    impl PostSource for FixedSource {
        async fn fetch_collection(&self) -> Result<PostCollection, FetchError> {
            self.0.clone().ok_or(FetchError::Status(503))
        }
    }

    fn identity() -> SiteIdentity {
        SiteIdentity {
            brand: "Buzzit".to_string(),
            public_url: "https://buzzit.kr".to_string(),
            description: "커뮤니티 인기글".to_string(),
            default_image: "https://buzzit.kr/og-image.png".to_string(),
        }
    }

    fn sample_post() -> Post {
        Post {
            site: "clien".to_string(),
            title: "오늘의 글".to_string(),
            url: "https://www.clien.net/service/board/park/1?od=T31".to_string(),
            author: Some("작성자".to_string()),
            timestamp: None,
            views: Some(10),
            likes: Some(2),
            comments: Some(1),
            collected_at: "2025-01-01T00:00:00".to_string(),
            thumbnail: Some("https://img.example/thumb.jpg".to_string()),
        }
    }

    fn resolver(collection: Option<PostCollection>) -> MetadataResolver {
        let store = PostStore::new(Arc::new(FixedSource(collection)), Duration::from_secs(60));
        MetadataResolver::new(Arc::new(store), identity())
    }

    fn collection() -> PostCollection {
        PostCollection::new(vec![sample_post()], CollectionMetadata::default())
    }

    #[test]
    fn classify_routes() {
        assert_eq!(Route::classify("/post/abc"), Route::Post("abc".into()));
        assert_eq!(Route::classify("/post/abc/?x=1"), Route::Post("abc".into()));
        assert_eq!(Route::classify("/site/clien"), Route::Site("clien".into()));
        assert_eq!(Route::classify("/about/"), Route::About);
        assert_eq!(Route::classify("/privacy"), Route::Privacy);
        assert_eq!(Route::classify("/terms?ref=footer"), Route::Terms);
        assert_eq!(Route::classify("/"), Route::Default);
        assert_eq!(Route::classify("/post"), Route::Default);
        assert_eq!(Route::classify("/post/a/b"), Route::Default);
    }

    #[tokio::test]
    async fn known_post_gets_article_metadata() {
        let resolver = resolver(Some(collection()));
        let path = format!("/post/{}", post_id::encode(&sample_post().url));

        let meta = resolver.resolve(&path).await;

        assert_eq!(meta.title, "오늘의 글 - 클리앙 | Buzzit");
        assert_eq!(meta.og_type, "article");
        assert_eq!(meta.og_image, "https://img.example/thumb.jpg");
        assert_eq!(meta.twitter_card, TwitterCard::SummaryLargeImage);
        assert_eq!(meta.canonical, format!("https://buzzit.kr{path}"));
        assert_eq!(meta.structured_data["@type"], "Article");
        assert_eq!(meta.structured_data["author"]["name"], "작성자");
        assert_eq!(meta.structured_data["isBasedOn"], sample_post().url.as_str());
    }

    #[tokio::test]
    async fn post_without_thumbnail_uses_default_image() {
        let mut post = sample_post();
        post.thumbnail = None;
        post.author = None;
        let resolver = resolver(Some(PostCollection::new(
            vec![post.clone()],
            CollectionMetadata::default(),
        )));

        let meta = resolver
            .resolve(&format!("/post/{}", post_id::encode(&post.url)))
            .await;

        assert_eq!(meta.og_image, "https://buzzit.kr/og-image.png");
        assert_eq!(meta.twitter_card, TwitterCard::Summary);
        assert!(meta.structured_data.get("author").is_none());
    }

    #[tokio::test]
    async fn unknown_or_malformed_post_falls_back_to_defaults() {
        let resolver = resolver(Some(collection()));
        let defaults = default_metadata(&identity());

        let unknown = resolver
            .resolve(&format!("/post/{}", post_id::encode("https://nowhere.example/1")))
            .await;
        assert_eq!(unknown, defaults);

        let malformed = resolver.resolve("/post/!!!").await;
        assert_eq!(malformed, defaults);
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_defaults() {
        let resolver = resolver(None);
        let meta = resolver
            .resolve(&format!("/post/{}", post_id::encode(&sample_post().url)))
            .await;

        assert_eq!(meta, default_metadata(&identity()));
    }

    #[tokio::test]
    async fn site_route_uses_display_name() {
        let resolver = resolver(None);

        let known = resolver.resolve("/site/clien").await;
        assert_eq!(known.title, "클리앙 인기 게시글 | Buzzit");
        assert_eq!(known.structured_data["@type"], "CollectionPage");
        assert_eq!(known.canonical, "https://buzzit.kr/site/clien");

        let unknown = resolver.resolve("/site/mystery").await;
        assert_eq!(unknown.title, "mystery 인기 게시글 | Buzzit");
    }

    #[tokio::test]
    async fn static_pages_and_root() {
        let resolver = resolver(None);

        let about = resolver.resolve("/about/").await;
        assert_eq!(about.title, "서비스 소개 | Buzzit");
        assert_eq!(about.canonical, "https://buzzit.kr/about");

        let root = resolver.resolve("/").await;
        assert_eq!(root.canonical, "https://buzzit.kr/");
        assert_eq!(root.structured_data["@type"], "WebSite");
    }

    #[test]
    fn splice_replaces_between_markers_only() {
        let document = format!(
            "<html><head><meta charset=\"utf-8\">{META_START_MARKER}<title>old</title>{META_END_MARKER}</head></html>"
        );

        let spliced = splice(&document, "<title>new</title>").expect("markers present");

        assert_eq!(
            spliced,
            format!(
                "<html><head><meta charset=\"utf-8\">{META_START_MARKER}<title>new</title>{META_END_MARKER}</head></html>"
            )
        );
    }

    #[test]
    fn splice_requires_both_markers() {
        assert!(splice("<html></html>", "x").is_none());
        assert!(splice(&format!("<html>{META_START_MARKER}</html>"), "x").is_none());
        assert!(splice(&format!("{META_END_MARKER}{META_START_MARKER}"), "x").is_none());
    }
}
