use std::{process, sync::Arc};

use buzzit::{
    application::{
        error::AppError,
        feed::{FeedQuery, FeedService},
        metadata::{MetadataResolver, SiteIdentity},
        repos::PostSource,
    },
    cache::PostStore,
    config::{self, AssetSource, FeedArgs},
    infra::{
        error::InfraError,
        http::{self, EdgeState, HttpState, RouterState},
        image_proxy::ImageProxy,
        origin::{AssetOrigin, DirectoryOrigin, HttpOrigin},
        telemetry,
        upstream::HttpPostSource,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Feed(args) => run_feed(settings, args).await,
    }
}

fn build_store(settings: &config::Settings) -> Result<Arc<PostStore>, AppError> {
    let source: Arc<dyn PostSource> = Arc::new(HttpPostSource::new(
        settings.upstream.posts_url.clone(),
        settings.upstream.timeout,
    )?);
    Ok(Arc::new(PostStore::new(source, settings.upstream.cache_ttl)))
}

fn build_origin(settings: &config::Settings) -> Result<Arc<dyn AssetOrigin>, AppError> {
    let origin: Arc<dyn AssetOrigin> = match &settings.edge.source {
        AssetSource::Remote(url) => Arc::new(HttpOrigin::new(url, settings.upstream.timeout)?),
        AssetSource::Directory(path) => {
            if !path.is_dir() {
                warn!(
                    target = "buzzit::serve",
                    path = %path.display(),
                    "static directory does not exist; edge requests will 404"
                );
            }
            Arc::new(DirectoryOrigin::new(path.clone()))
        }
    };
    Ok(origin)
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store = build_store(&settings)?;
    let identity = SiteIdentity::from_settings(&settings.site);
    let resolver = Arc::new(MetadataResolver::new(Arc::clone(&store), identity));

    let router_state = RouterState {
        http: HttpState {
            feed: Arc::new(FeedService::new(Arc::clone(&store))),
            store: Arc::clone(&store),
            images: Arc::new(ImageProxy::new(settings.upstream.timeout)?),
        },
        edge: EdgeState::new(build_origin(&settings)?, resolver),
    };
    let router = http::build_router(router_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        target = "buzzit::serve",
        addr = %settings.server.addr,
        posts_url = %settings.upstream.posts_url,
        cache_ttl_seconds = settings.upstream.cache_ttl.as_secs(),
        "listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    info!(target = "buzzit::serve", "server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(target = "buzzit::serve", error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "buzzit::serve", "shutdown signal received");
}

async fn run_feed(settings: config::Settings, args: FeedArgs) -> Result<(), AppError> {
    let store = build_store(&settings)?;
    let feed = FeedService::new(store);

    let page = args.page.to_string();
    let query = FeedQuery::from_params(Some(&args.site), Some(&args.sort), Some(&page));
    let page = feed
        .page(&query)
        .await
        .map_err(|err| AppError::unexpected(format!("failed to load feed: {err}")))?;

    let json = serde_json::to_string_pretty(&page)
        .map_err(|err| AppError::unexpected(format!("failed to encode feed: {err}")))?;
    println!("{json}");
    Ok(())
}
