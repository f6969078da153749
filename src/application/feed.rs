use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use thiserror::Error;

use crate::application::pagination::{self, PAGE_SIZE, PageSlot};
use crate::application::ranking::{self, SortMode};
use crate::application::repos::FetchError;
use crate::cache::PostStore;
use crate::domain::posts::{CollectionMetadata, Post, PostCollection};

const ALL_SITES: &str = "all";

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum SiteFilter {
    #[default]
    All,
    Site(String),
}

impl SiteFilter {
    /// `"all"` and the empty string select every site; anything else is a site code.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed == ALL_SITES {
            SiteFilter::All
        } else {
            SiteFilter::Site(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            SiteFilter::All => ALL_SITES,
            SiteFilter::Site(code) => code.as_str(),
        }
    }

    pub fn matches(&self, post: &Post) -> bool {
        match self {
            SiteFilter::All => true,
            SiteFilter::Site(code) => post.site == *code,
        }
    }
}

/// Filters, ranks and (for the unfiltered chronological feed) interleaves.
pub fn compose(all: &[Post], filter: &SiteFilter, mode: SortMode) -> Vec<Post> {
    let ranked = match filter {
        SiteFilter::All => ranking::rank(all, mode),
        SiteFilter::Site(_) => {
            let filtered: Vec<Post> = all
                .iter()
                .filter(|post| filter.matches(post))
                .cloned()
                .collect();
            ranking::rank(&filtered, mode)
        }
    };

    if *filter == SiteFilter::All && mode == SortMode::Latest {
        interleave(ranked)
    } else {
        ranked
    }
}

/// Round-robins posts across sites so no single community dominates a page.
///
/// Sites take turns in order of first appearance and each site keeps its
/// internal order.
pub fn interleave(posts: Vec<Post>) -> Vec<Post> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<Post>> = HashMap::new();
    for post in &posts {
        if !groups.contains_key(&post.site) {
            order.push(post.site.clone());
        }
        groups.entry(post.site.clone()).or_default().push(post.clone());
    }

    if order.len() <= 1 {
        return posts;
    }

    let mut queues: Vec<std::vec::IntoIter<Post>> = order
        .iter()
        .filter_map(|site| groups.remove(site))
        .map(Vec::into_iter)
        .collect();

    let mut interleaved = Vec::with_capacity(posts.len());
    loop {
        let mut emitted = false;
        for queue in &mut queues {
            if let Some(post) = queue.next() {
                interleaved.push(post);
                emitted = true;
            }
        }
        if !emitted {
            break;
        }
    }
    interleaved
}

/// Client-facing feed state: which site, which ordering, which page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    pub site: SiteFilter,
    pub sort: SortMode,
    pub page: usize,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            site: SiteFilter::All,
            sort: SortMode::Latest,
            page: 1,
        }
    }
}

impl FeedQuery {
    /// Builds a query from raw parameters; a missing, zero or unparsable page becomes 1.
    pub fn from_params(site: Option<&str>, sort: Option<&str>, page: Option<&str>) -> Self {
        let page = page
            .and_then(|value| value.trim().parse::<usize>().ok())
            .filter(|value| *value >= 1)
            .unwrap_or(1);
        Self {
            site: site.map(SiteFilter::parse).unwrap_or_default(),
            sort: sort.map(SortMode::parse).unwrap_or_default(),
            page,
        }
    }

    pub fn with_site(&self, site: SiteFilter) -> Self {
        Self {
            site,
            sort: self.sort,
            page: 1,
        }
    }

    pub fn with_sort(&self, sort: SortMode) -> Self {
        Self {
            site: self.site.clone(),
            sort,
            page: 1,
        }
    }

    pub fn with_page(&self, page: usize) -> Self {
        Self {
            site: self.site.clone(),
            sort: self.sort,
            page: page.max(1),
        }
    }

    /// Non-default parameters in canonical order (`site`, `sort`, `page`).
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if self.site != SiteFilter::All {
            pairs.push(("site", self.site.as_str().to_string()));
        }
        if self.sort != SortMode::Latest {
            pairs.push(("sort", self.sort.as_str().to_string()));
        }
        if self.page > 1 {
            pairs.push(("page", self.page.to_string()));
        }
        pairs
    }

    pub fn to_query_string(&self) -> String {
        let mut serializer = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in self.to_query_pairs() {
            serializer.append_pair(key, &value);
        }
        serializer.finish()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub page: usize,
    pub total_pages: usize,
    pub total_posts: usize,
    pub window: Vec<PageSlot>,
    pub site: String,
    pub sort: SortMode,
    pub query: String,
    pub collected_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostList {
    pub posts: Vec<Post>,
    pub metadata: CollectionMetadata,
}

#[derive(Debug, Error)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Clone)]
pub struct FeedService {
    store: Arc<PostStore>,
}

impl FeedService {
    pub fn new(store: Arc<PostStore>) -> Self {
        Self { store }
    }

    /// One page of the composed feed for `query`.
    pub async fn page(&self, query: &FeedQuery) -> Result<FeedPage, FeedError> {
        let collection = self.store.load().await?;
        Ok(build_page(&collection, query))
    }

    /// The composed feed without pagination, optionally truncated to `limit`.
    /// A limit of zero means no limit.
    pub async fn list(
        &self,
        filter: &SiteFilter,
        sort: SortMode,
        limit: Option<usize>,
    ) -> Result<PostList, FeedError> {
        let collection = self.store.load().await?;
        let mut posts = compose(&collection.posts, filter, sort);
        if let Some(limit) = limit.filter(|&limit| limit > 0) {
            posts.truncate(limit);
        }

        let sites = match filter {
            SiteFilter::All => collection
                .metadata
                .sites
                .clone()
                .unwrap_or_else(|| collection.site_codes()),
            SiteFilter::Site(code) => vec![code.clone()],
        };

        Ok(PostList {
            metadata: CollectionMetadata {
                total_posts: posts.len(),
                collected_at: collection.metadata.collected_at.clone(),
                sites: Some(sites),
                site: None,
            },
            posts,
        })
    }

    /// Posts of one site in document order.
    pub async fn site_posts(&self, code: &str) -> Result<PostList, FeedError> {
        let collection = self.store.load().await?;
        let posts: Vec<Post> = collection.posts_for_site(code).cloned().collect();

        Ok(PostList {
            metadata: CollectionMetadata {
                total_posts: posts.len(),
                collected_at: collection.metadata.collected_at.clone(),
                sites: None,
                site: Some(code.to_string()),
            },
            posts,
        })
    }

    pub async fn post_detail(&self, url: &str) -> Result<Option<Post>, FeedError> {
        let collection = self.store.load().await?;
        Ok(collection.find_by_url(url).cloned())
    }
}

pub fn build_page(collection: &PostCollection, query: &FeedQuery) -> FeedPage {
    let composed = compose(&collection.posts, &query.site, query.sort);
    let total_posts = composed.len();
    let page = pagination::paginate(&composed, PAGE_SIZE, query.page);

    FeedPage {
        window: pagination::page_window(page.page, page.total_pages),
        posts: page.items,
        page: page.page,
        total_pages: page.total_pages,
        total_posts,
        site: query.site.as_str().to_string(),
        sort: query.sort,
        query: query.to_query_string(),
        collected_at: collection.metadata.collected_at.clone(),
    }
}
