use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{
        HeaderValue, StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    application::{
        error::HttpError,
        feed::{FeedQuery, FeedService, SiteFilter},
        ranking::SortMode,
    },
    cache::PostStore,
    domain::{posts::Post, sites},
    infra::image_proxy::{ImageProxy, ImageProxyError},
};

use super::{
    RouterState,
    edge::serve_edge,
    middleware::{log_responses, set_request_context},
};

const IMAGE_CACHE_CONTROL: &str = "public, max-age=86400";

#[derive(Clone)]
pub struct HttpState {
    pub feed: Arc<FeedService>,
    pub store: Arc<PostStore>,
    pub images: Arc<ImageProxy>,
}

pub fn build_router(state: RouterState) -> Router {
    let api = Router::new()
        .route("/feed", get(feed_page))
        .route("/posts", get(list_posts))
        .route("/posts/{site}", get(site_posts))
        .route("/post/detail", get(post_detail))
        .route("/sites", get(list_sites))
        .route("/health", get(health))
        .route("/image-proxy", get(image_proxy));

    Router::new()
        .nest("/api", api)
        .fallback(serve_edge)
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FeedParams {
    site: Option<String>,
    sort: Option<String>,
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ListParams {
    site: Option<String>,
    sort: Option<String>,
    limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailParams {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageParams {
    url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostDetailBody {
    post: Post,
}

#[derive(Debug, Serialize)]
struct SitesBody {
    sites: &'static [sites::SiteInfo],
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    timestamp: String,
    cached_posts: usize,
    cache_timestamp: Option<String>,
    cache_age_seconds: Option<u64>,
    cache_ttl_seconds: u64,
    version: &'static str,
}

async fn feed_page(
    State(state): State<HttpState>,
    Query(params): Query<FeedParams>,
) -> Result<Response, HttpError> {
    let query = FeedQuery::from_params(
        params.site.as_deref(),
        params.sort.as_deref(),
        params.page.as_deref(),
    );
    let page = state.feed.page(&query).await?;
    Ok(Json(page).into_response())
}

async fn list_posts(
    State(state): State<HttpState>,
    Query(params): Query<ListParams>,
) -> Result<Response, HttpError> {
    let filter = params
        .site
        .as_deref()
        .map(SiteFilter::parse)
        .unwrap_or_default();
    let sort = params
        .sort
        .as_deref()
        .map(SortMode::parse)
        .unwrap_or_default();

    let list = state.feed.list(&filter, sort, params.limit).await?;
    Ok(Json(list).into_response())
}

async fn site_posts(
    State(state): State<HttpState>,
    Path(site): Path<String>,
) -> Result<Response, HttpError> {
    let list = state.feed.site_posts(&site).await?;
    Ok(Json(list).into_response())
}

async fn post_detail(
    State(state): State<HttpState>,
    Query(params): Query<DetailParams>,
) -> Result<Response, HttpError> {
    let Some(url) = params.url.filter(|url| !url.trim().is_empty()) else {
        return Err(HttpError::new(
            "infra::http::public::post_detail",
            StatusCode::BAD_REQUEST,
            "Missing `url` parameter",
            "post detail requested without a url",
        ));
    };

    match state.feed.post_detail(&url).await? {
        Some(post) => Ok(Json(PostDetailBody { post }).into_response()),
        None => Err(HttpError::new(
            "infra::http::public::post_detail",
            StatusCode::NOT_FOUND,
            "Post not found",
            format!("no cached post with url `{url}`"),
        )),
    }
}

async fn list_sites() -> Json<SitesBody> {
    Json(SitesBody { sites: sites::SITES })
}

async fn health(State(state): State<HttpState>) -> Json<HealthBody> {
    let snapshot = state.store.snapshot().await;
    let (cached_posts, cache_timestamp, cache_age_seconds) = match snapshot {
        Some((collection, age)) => (
            collection.len(),
            Some(collection.metadata.collected_at.clone()),
            Some(age.as_secs()),
        ),
        None => (0, None, None),
    };

    Json(HealthBody {
        status: "healthy",
        timestamp: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        cached_posts,
        cache_timestamp,
        cache_age_seconds,
        cache_ttl_seconds: state.store.ttl().as_secs(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn image_proxy(
    State(state): State<HttpState>,
    Query(params): Query<ImageParams>,
) -> Result<Response, HttpError> {
    let url = params.url.unwrap_or_default();
    let image = state.images.fetch(&url).await.map_err(image_error)?;

    let mut response = image.body.into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&image.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static(IMAGE_CACHE_CONTROL));
    Ok(response)
}

fn image_error(err: ImageProxyError) -> HttpError {
    const SOURCE: &str = "infra::http::public::image_proxy";
    match err {
        ImageProxyError::Forbidden(_) | ImageProxyError::InvalidUrl(_) => HttpError::from_error(
            SOURCE,
            StatusCode::FORBIDDEN,
            "Proxy not allowed for this domain",
            &err,
        ),
        ImageProxyError::Upstream(code) => HttpError::from_error(
            SOURCE,
            StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
            "Upstream error",
            &err,
        ),
        ImageProxyError::Transport(_) => HttpError::from_error(
            SOURCE,
            StatusCode::BAD_GATEWAY,
            "Failed to fetch image",
            &err,
        ),
    }
}
