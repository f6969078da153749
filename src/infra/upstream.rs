//! HTTP source for the scraped post document.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::application::repos::{FetchError, PostSource};
use crate::domain::posts::PostCollection;

use super::error::InfraError;

pub const USER_AGENT: &str = concat!("buzzit/", env!("CARGO_PKG_VERSION"));

pub struct HttpPostSource {
    client: reqwest::Client,
    url: Url,
}

impl HttpPostSource {
    pub fn new(url: Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl PostSource for HttpPostSource {
    async fn fetch_collection(&self) -> Result<PostCollection, FetchError> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(FetchError::unreachable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let collection: PostCollection = response.json().await.map_err(FetchError::decode)?;

        debug!(
            target = "buzzit::infra::upstream",
            url = %self.url,
            posts = collection.len(),
            "fetched post document"
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use axum::{Router, http::StatusCode, routing::get};

    use super::*;

    async fn serve(router: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });
        Url::parse(&format!("http://{addr}/posts.json")).expect("url")
    }

    fn source(url: Url) -> HttpPostSource {
        HttpPostSource::new(url, Duration::from_secs(5)).expect("client")
    }

    #[tokio::test]
    async fn decodes_the_post_document() {
        let url = serve(Router::new().route(
            "/posts.json",
            get(|| async {
                r#"{"posts":[{"site":"clien","title":"t","url":"https://www.clien.net/1"}],
                    "metadata":{"total_posts":1,"collected_at":"2025-01-01T00:00:00"}}"#
            }),
        ))
        .await;

        let collection = source(url).fetch_collection().await.expect("fetch");
        assert_eq!(collection.len(), 1);
        assert_eq!(collection.metadata.collected_at, "2025-01-01T00:00:00");
    }

    #[tokio::test]
    async fn malformed_document_is_a_decode_error() {
        let url = serve(Router::new().route("/posts.json", get(|| async { "{not json" }))).await;

        let err = source(url).fetch_collection().await.expect_err("malformed");
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let url = serve(Router::new().route(
            "/posts.json",
            get(|| async { (StatusCode::BAD_GATEWAY, "down") }),
        ))
        .await;

        let err = source(url).fetch_collection().await.expect_err("status");
        assert!(matches!(err, FetchError::Status(502)));
    }
}
