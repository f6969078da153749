//! Edge document rewriting for every path the API router does not own.
//!
//! Assets pass straight through from the origin. Client-side routes fall back
//! to the SPA shell, and every HTML document gets route metadata spliced in
//! between the marker comments before it leaves.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderValue, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{debug, warn};

use crate::application::metadata::{self, MetadataResolver};
use crate::infra::origin::{AssetOrigin, OriginResponse};
use crate::infra::telemetry::{EDGE_PASSTHROUGH_TOTAL, EDGE_REWRITE_TOTAL};
use crate::presentation::head;

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Clone)]
pub struct EdgeState {
    pub origin: Arc<dyn AssetOrigin>,
    pub resolver: Arc<MetadataResolver>,
}

impl EdgeState {
    pub fn new(origin: Arc<dyn AssetOrigin>, resolver: Arc<MetadataResolver>) -> Self {
        Self { origin, resolver }
    }
}

pub async fn serve_edge(State(state): State<EdgeState>, uri: Uri) -> Response {
    let target = uri
        .path_and_query()
        .map(|value| value.as_str())
        .unwrap_or("/");
    serve_document(&state, uri.path(), target).await
}

/// Applies the pass-through and SPA fallback rules for one request.
pub async fn serve_document(state: &EdgeState, path: &str, target: &str) -> Response {
    let direct = state.origin.fetch(target).await;

    let document = if direct.is_success() {
        if !direct.is_html() {
            return pass_through(direct);
        }
        direct
    } else if has_file_extension(path) {
        return pass_through(direct);
    } else {
        let shell = state.origin.fetch("/").await;
        if !(shell.is_success() && shell.is_html()) {
            debug!(
                target = "buzzit::http::edge",
                path,
                shell_status = shell.status.as_u16(),
                "spa shell unavailable; returning original failure"
            );
            return pass_through(direct);
        }
        shell
    };

    inject_metadata(state, path, document).await
}

fn pass_through(response: OriginResponse) -> Response {
    metrics::counter!(EDGE_PASSTHROUGH_TOTAL).increment(1);
    response.into_response()
}

async fn inject_metadata(state: &EdgeState, path: &str, document: OriginResponse) -> Response {
    let meta = state.resolver.resolve(path).await;
    let brand = state.resolver.identity().brand.as_str();

    let rewritten = match head::render_head(&meta, brand) {
        Ok(markup) => std::str::from_utf8(&document.body)
            .ok()
            .and_then(|html| metadata::splice(html, &markup)),
        Err(err) => {
            warn!(
                target = "buzzit::http::edge",
                path,
                error = %err,
                "failed to render head markup"
            );
            None
        }
    };

    let body = match rewritten {
        Some(html) => {
            metrics::counter!(EDGE_REWRITE_TOTAL).increment(1);
            Bytes::from(html)
        }
        None => {
            debug!(
                target = "buzzit::http::edge",
                path,
                "document has no metadata markers; serving unchanged"
            );
            document.body
        }
    };

    (
        StatusCode::OK,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        )],
        body,
    )
        .into_response()
}

/// Whether the last path segment ends in `.ext` with a short alphanumeric `ext`.
pub fn has_file_extension(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or_default();
    let Some((_, extension)) = segment.rsplit_once('.') else {
        return false;
    };
    !extension.is_empty()
        && extension.len() <= MAX_EXTENSION_LEN
        && extension.chars().all(|ch| ch.is_ascii_alphanumeric())
}
