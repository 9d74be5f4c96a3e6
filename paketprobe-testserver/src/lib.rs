use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::Router;
use axum::routing::{delete, get, put};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time::Duration;

mod cache;
mod handlers;
mod store;

pub use cache::{KEY_PAKET_LIST, KEY_STATS, TTL_PAKET_LIST_SECS, TTL_STATS_SECS};
pub use store::SEED_MD5_HASHES;

use cache::ResponseCache;
use store::Store;

pub const PATH_HEALTH: &str = "/health";
pub const PATH_API_HEALTH: &str = "/api/health";
pub const PATH_API_DOCS: &str = "/api";
pub const PATH_STATS: &str = "/api/stats";
pub const PATH_PAKET: &str = "/api/paket";

/// How the mock advertises cache behavior on `/api/paket` and `/api/stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
    /// First request per key is a MISS, later ones HIT until the TTL runs out.
    #[default]
    Enabled,
    /// Every request recomputes and reports MISS.
    Disabled,
    /// Like `Disabled`, but no cache headers are sent at all.
    NoHeaders,
}

#[derive(Debug, Clone)]
pub struct TestServerOptions {
    pub cache_mode: CacheMode,
    /// Status returned by both health endpoints.
    pub health_status: u16,
    /// 1-based index (across cached endpoints) of a request that stalls for `stall_for`.
    pub stall_request: Option<u64>,
    pub stall_for: Duration,
    /// Artificial latency of the recompute path.
    pub miss_delay: Duration,
}

impl Default for TestServerOptions {
    fn default() -> Self {
        Self {
            cache_mode: CacheMode::Enabled,
            health_status: 200,
            stall_request: None,
            stall_for: Duration::from_secs(5),
            miss_delay: Duration::from_millis(40),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TestServerStats {
    requests_total: Arc<AtomicU64>,
    cached_requests: Arc<AtomicU64>,
    cache_hits: Arc<AtomicU64>,
    cache_misses: Arc<AtomicU64>,
}

impl TestServerStats {
    fn inc_requests_total(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the 1-based index of this cached-endpoint request.
    fn next_cached_request(&self) -> u64 {
        self.cached_requests.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn inc_cache_hits(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn inc_cache_misses(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn requests_total(&self) -> u64 {
        self.requests_total.load(Ordering::Relaxed)
    }

    pub fn cached_requests(&self) -> u64 {
        self.cached_requests.load(Ordering::Relaxed)
    }

    pub fn cache_hits(&self) -> u64 {
        self.cache_hits.load(Ordering::Relaxed)
    }

    pub fn cache_misses(&self) -> u64 {
        self.cache_misses.load(Ordering::Relaxed)
    }
}

pub(crate) struct Shared {
    options: TestServerOptions,
    stats: TestServerStats,
    store: Mutex<Store>,
    cache: Mutex<ResponseCache>,
}

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<Shared>,
}

impl AppState {
    fn new(options: TestServerOptions, stats: TestServerStats) -> Self {
        Self {
            inner: Arc::new(Shared {
                options,
                stats,
                store: Mutex::new(Store::default()),
                cache: Mutex::new(ResponseCache::default()),
            }),
        }
    }

    pub(crate) fn options(&self) -> &TestServerOptions {
        &self.inner.options
    }

    pub(crate) fn stats(&self) -> &TestServerStats {
        &self.inner.stats
    }

    pub(crate) fn store(&self) -> MutexGuard<'_, Store> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn cache(&self) -> MutexGuard<'_, ResponseCache> {
        self.inner
            .cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub fn router(options: TestServerOptions, stats: TestServerStats) -> Router {
    use handlers::*;

    Router::new()
        .route(PATH_HEALTH, get(handle_health))
        .route(PATH_API_HEALTH, get(handle_health))
        .route(PATH_API_DOCS, get(handle_docs))
        .route(PATH_STATS, get(handle_stats))
        .route(PATH_PAKET, get(handle_paket_list).post(handle_paket_create))
        .route(
            "/api/paket/{id}",
            get(handle_paket_get)
                .put(handle_paket_update)
                .delete(handle_paket_delete),
        )
        .route("/api/auth/register", axum::routing::post(handle_register))
        .route("/api/auth/login", axum::routing::post(handle_login))
        .route(
            "/api/users/profile",
            get(handle_profile_get).put(handle_profile_update),
        )
        .route("/api/users/change-password", put(handle_change_password))
        .route("/api/users/account", delete(handle_delete_account))
        .route(
            "/api/favorites",
            get(handle_favorites_list)
                .post(handle_favorites_add)
                .delete(handle_favorites_clear),
        )
        .route("/api/favorites/stats", get(handle_favorites_stats))
        .route(
            "/api/favorites/check/{md5_hash}",
            get(handle_favorites_check),
        )
        .route("/api/favorites/{md5_hash}", delete(handle_favorites_remove))
        .with_state(AppState::new(options, stats))
}

pub struct TestServer {
    addr: SocketAddr,
    base_url: String,
    stats: TestServerStats,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(TestServerOptions::default()).await
    }

    pub async fn start_with(options: TestServerOptions) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let stats = TestServerStats::default();
        let app = router(options, stats.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            });
            let _ = serve.await;
        });

        Ok(Self {
            addr,
            base_url: format!("http://{addr}"),
            stats,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn stats(&self) -> &TestServerStats {
        &self.stats
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(task) = self.task.take() {
            // A stalled handler would otherwise hold graceful shutdown open.
            let abort = task.abort_handle();
            if tokio::time::timeout(Duration::from_secs(2), task).await.is_err() {
                tracing::warn!("test server did not shut down in time, aborting");
                abort.abort();
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if self.shutdown_tx.is_some()
            && let Some(task) = self.task.take()
        {
            task.abort();
        }
    }
}
