#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use axum::{Router, body::Body, http::Request, response::Response};
use http_body_util::BodyExt;
use tower::ServiceExt;

use buzzit::{
    application::{
        feed::FeedService,
        metadata::{MetadataResolver, SiteIdentity},
        repos::{FetchError, PostSource},
    },
    cache::PostStore,
    domain::posts::{CollectionMetadata, Post, PostCollection},
    infra::{
        http::{EdgeState, HttpState, RouterState, build_router},
        image_proxy::ImageProxy,
        origin::{AssetOrigin, OriginResponse},
    },
};

pub const SHELL: &str = "<!doctype html><html><head><!--BUZZIT_META_START--><title>placeholder</title><!--BUZZIT_META_END--></head><body><div id=\"app\"></div></body></html>";

pub struct StubSource(pub Option<PostCollection>);

#[async_trait]
impl PostSource for StubSource {
    async fn fetch_collection(&self) -> Result<PostCollection, FetchError> {
        self.0
            .clone()
            .ok_or_else(|| FetchError::unreachable("stub upstream is down"))
    }
}

#[derive(Default)]
pub struct StubOrigin {
    files: HashMap<String, OriginResponse>,
}

impl StubOrigin {
    pub fn with(mut self, target: &str, response: OriginResponse) -> Self {
        self.files.insert(target.to_string(), response);
        self
    }

    pub fn with_shell(self) -> Self {
        self.with("/", OriginResponse::ok("text/html", SHELL))
    }
}

#[async_trait]
impl AssetOrigin for StubOrigin {
    async fn fetch(&self, target: &str) -> OriginResponse {
        self.files
            .get(target)
            .cloned()
            .unwrap_or_else(|| OriginResponse::empty(axum::http::StatusCode::NOT_FOUND))
    }
}

pub fn post(site: &str, title: &str, url: &str, likes: u64) -> Post {
    Post {
        site: site.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        author: Some("작성자".to_string()),
        timestamp: Some("2026-10-18 09:00".to_string()),
        views: Some(likes * 10),
        likes: Some(likes),
        comments: Some(likes / 2),
        collected_at: "2026-10-18T09:05:00+09:00".to_string(),
        thumbnail: None,
    }
}

pub fn collection(posts: Vec<Post>) -> PostCollection {
    PostCollection {
        metadata: CollectionMetadata {
            total_posts: posts.len(),
            collected_at: "2026-10-18T09:05:00+09:00".to_string(),
            sites: None,
            site: None,
        },
        posts,
    }
}

pub fn identity() -> SiteIdentity {
    SiteIdentity {
        brand: "Buzzit".to_string(),
        public_url: "https://buzzit.test".to_string(),
        description: "커뮤니티 인기글 모음".to_string(),
        default_image: "https://buzzit.test/og-image.png".to_string(),
    }
}

pub fn router(collection: Option<PostCollection>, origin: StubOrigin) -> Router {
    let source: Arc<dyn PostSource> = Arc::new(StubSource(collection));
    let store = Arc::new(PostStore::new(source, Duration::from_secs(300)));
    let resolver = Arc::new(MetadataResolver::new(Arc::clone(&store), identity()));

    build_router(RouterState {
        http: HttpState {
            feed: Arc::new(FeedService::new(Arc::clone(&store))),
            store,
            images: Arc::new(ImageProxy::new(Duration::from_secs(5)).expect("image client")),
        },
        edge: EdgeState::new(Arc::new(origin), resolver),
    })
}

pub async fn get(router: Router, uri: &str) -> Response {
    router
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router is infallible")
}

pub async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

pub async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}
