//! Where the SPA bundle and its assets are fetched from.

use std::{io::ErrorKind, path::PathBuf, time::Duration};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::warn;
use url::Url;

use super::error::InfraError;
use super::upstream::USER_AGENT;

const HTML_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Origin headers worth forwarding to the client on pass-through.
const FORWARDED_HEADERS: [HeaderName; 4] = [
    header::CONTENT_TYPE,
    header::CACHE_CONTROL,
    header::ETAG,
    header::LAST_MODIFIED,
];

#[derive(Debug, Clone)]
pub struct OriginResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OriginResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn empty(status: StatusCode) -> Self {
        Self::new(status, HeaderMap::new(), Bytes::new())
    }

    /// A 200 response carrying `body` with the given content type.
    pub fn ok(content_type: &str, body: impl Into<Bytes>) -> Self {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(content_type) {
            headers.insert(header::CONTENT_TYPE, value);
        }
        Self::new(StatusCode::OK, headers, body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    pub fn is_html(&self) -> bool {
        self.content_type()
            .and_then(|value| value.split(';').next())
            .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("text/html"))
    }
}

impl IntoResponse for OriginResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

#[async_trait]
pub trait AssetOrigin: Send + Sync {
    /// Fetches `target` (a path, optionally with a query). Never fails:
    /// transport problems come back as a gateway error status.
    async fn fetch(&self, target: &str) -> OriginResponse;
}

/// Forwards requests to a static host serving the built bundle.
pub struct HttpOrigin {
    client: reqwest::Client,
    base: String,
}

impl HttpOrigin {
    pub fn new(base: &Url, timeout: Duration) -> Result<Self, InfraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn target_url(&self, target: &str) -> String {
        if target.starts_with('/') {
            format!("{}{target}", self.base)
        } else {
            format!("{}/{target}", self.base)
        }
    }
}

#[async_trait]
impl AssetOrigin for HttpOrigin {
    async fn fetch(&self, target: &str) -> OriginResponse {
        let url = self.target_url(target);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(target = "buzzit::infra::origin", url = %url, error = %err, "origin unreachable");
                return OriginResponse::empty(StatusCode::BAD_GATEWAY);
            }
        };

        let status =
            StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
        let mut headers = HeaderMap::new();
        for name in FORWARDED_HEADERS {
            if let Some(value) = response
                .headers()
                .get(name.as_str())
                .and_then(|value| HeaderValue::from_bytes(value.as_bytes()).ok())
            {
                headers.insert(name, value);
            }
        }

        match response.bytes().await {
            Ok(body) => OriginResponse::new(status, headers, body),
            Err(err) => {
                warn!(target = "buzzit::infra::origin", url = %url, error = %err, "origin body unreadable");
                OriginResponse::empty(StatusCode::BAD_GATEWAY)
            }
        }
    }
}

/// Serves the bundle from a local directory, `index.html` standing in for `/`.
pub struct DirectoryOrigin {
    root: PathBuf,
}

impl DirectoryOrigin {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Maps a request target onto a path under the root, or `None` when the
    /// target tries to leave it.
    fn resolve(&self, target: &str) -> Option<PathBuf> {
        let path = target.split(['?', '#']).next().unwrap_or_default();
        let decoded = urlencoding::decode(path).ok()?;

        let mut relative = decoded.trim_start_matches('/').to_string();
        if relative.is_empty() || relative.ends_with('/') {
            relative.push_str("index.html");
        }

        let escapes = relative
            .split('/')
            .any(|segment| segment == ".." || segment.contains(['\\', '\0']));
        if escapes {
            return None;
        }

        Some(self.root.join(relative))
    }
}

#[async_trait]
impl AssetOrigin for DirectoryOrigin {
    async fn fetch(&self, target: &str) -> OriginResponse {
        let Some(path) = self.resolve(target) else {
            return OriginResponse::empty(StatusCode::NOT_FOUND);
        };

        match tokio::fs::read(&path).await {
            Ok(contents) => {
                let mime = mime_guess::from_path(&path).first_or_octet_stream();
                let content_type = if mime.essence_str() == "text/html" {
                    HTML_CONTENT_TYPE.to_string()
                } else {
                    mime.to_string()
                };
                OriginResponse::ok(&content_type, contents)
            }
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::IsADirectory) => {
                OriginResponse::empty(StatusCode::NOT_FOUND)
            }
            Err(err) => {
                warn!(
                    target = "buzzit::infra::origin",
                    path = %path.display(),
                    error = %err,
                    "failed to read bundle file"
                );
                OriginResponse::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_detection_ignores_parameters_and_case() {
        assert!(OriginResponse::ok("text/html; charset=utf-8", "").is_html());
        assert!(OriginResponse::ok("TEXT/HTML", "").is_html());
        assert!(!OriginResponse::ok("application/javascript", "").is_html());
        assert!(!OriginResponse::empty(StatusCode::OK).is_html());
    }

    #[test]
    fn directory_targets_stay_under_root() {
        let origin = DirectoryOrigin::new("/srv/dist");

        assert_eq!(
            origin.resolve("/"),
            Some(PathBuf::from("/srv/dist/index.html"))
        );
        assert_eq!(
            origin.resolve("/assets/app.js?v=3"),
            Some(PathBuf::from("/srv/dist/assets/app.js"))
        );
        assert_eq!(origin.resolve("/../etc/passwd"), None);
        assert_eq!(origin.resolve("/assets/%2e%2e/secret"), None);
    }

    #[test]
    fn http_origin_joins_base_and_target() {
        let base = Url::parse("https://static.example/app/").expect("url");
        let origin = HttpOrigin::new(&base, Duration::from_secs(5)).expect("client");

        assert_eq!(
            origin.target_url("/post/abc?x=1"),
            "https://static.example/app/post/abc?x=1"
        );
    }
}
