//! The [`Replay`] factory and its builder.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use replaybox_backend::{MemoryStore, ResponseCache, Store, StoreResult};
use replaybox_core::TransportFactory;
use smol_str::SmolStr;
use tracing::debug;

use crate::config::ReplayConfig;
use crate::error::ConfigError;
use crate::offload::{OffloadConfig, OffloadManager};
use crate::proxy::RequestProxy;

/// State shared by a [`Replay`] and every proxy it has created.
pub(crate) struct ReplayContext<F> {
    pub(crate) original: Arc<F>,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) offload: OffloadManager,
    refresh_on_hit: AtomicBool,
}

impl<F> ReplayContext<F> {
    pub(crate) fn refresh_on_hit(&self) -> bool {
        self.refresh_on_hit.load(Ordering::SeqCst)
    }
}

/// Caching drop-in for a [`TransportFactory`].
///
/// `Replay` is itself a `TransportFactory`; code generic over the factory
/// keeps working unchanged, but every transport it creates is a
/// [`RequestProxy`] consulting the shared response cache first.
///
/// Runtime toggles apply to proxies already handed out, since all of them
/// read the same flags at `send` time. Clones share everything.
///
/// ```ignore
/// let replay = Replay::builder(ReqwestTransportFactory::default())
///     .refresh_on_hit(false)
///     .build();
///
/// let mut request = replay.create();
/// request.open(RequestIdentity::new("GET", "https://example.com/users"));
/// request.send(None).await?;
/// ```
pub struct Replay<F> {
    context: Arc<ReplayContext<F>>,
    defaults: Toggles,
}

#[derive(Clone, Copy, Debug)]
struct Toggles {
    no_cache: bool,
    refresh_on_hit: bool,
}

impl<F> Replay<F>
where
    F: TransportFactory,
{
    /// Wraps `original` with an in-memory cache and default settings.
    pub fn new(original: F) -> Self {
        Self::builder(original).build()
    }

    /// Starts configuring a replay around `original`.
    pub fn builder(original: F) -> ReplayBuilder<F> {
        ReplayBuilder::new(original)
    }

    /// Builds a replay from declarative configuration, opening its store.
    pub fn from_config(original: F, config: ReplayConfig) -> Result<Self, ConfigError> {
        Self::builder(original).config(config).try_build()
    }
}

impl<F> Replay<F> {
    /// The wrapped factory. Transports created from it bypass the cache.
    pub fn original(&self) -> &F {
        &self.context.original
    }

    /// Shared response cache.
    pub fn cache(&self) -> &ResponseCache {
        &self.context.cache
    }

    /// Background task manager running cache refreshes.
    pub fn offload(&self) -> &OffloadManager {
        &self.context.offload
    }

    /// Removes every cached response in this replay's namespace.
    ///
    /// Returns the number of entries removed.
    pub fn clear_cache(&self) -> StoreResult<usize> {
        self.context.cache.clear_all()
    }

    /// Stops reading and writing the cache; stored entries are kept.
    pub fn disable_cache(&self) {
        self.context.cache.disable();
    }

    /// Resumes reading and writing the cache.
    pub fn enable_cache(&self) {
        self.context.cache.enable();
    }

    /// Disables (`true`) or re-enables (`false`) the cache.
    pub fn set_no_cache(&self, no_cache: bool) {
        if no_cache {
            self.disable_cache();
        } else {
            self.enable_cache();
        }
    }

    /// Returns `true` while the cache is bypassed.
    pub fn no_cache(&self) -> bool {
        !self.context.cache.is_enabled()
    }

    /// Turns background refresh of cache hits on or off.
    pub fn set_refresh_on_hit(&self, refresh: bool) {
        self.context.refresh_on_hit.store(refresh, Ordering::SeqCst);
    }

    /// Whether cache hits are refreshed from the network.
    pub fn refresh_on_hit(&self) -> bool {
        self.context.refresh_on_hit()
    }

    /// Restores the toggles this replay was built with.
    pub fn reset(&self) {
        self.set_no_cache(self.defaults.no_cache);
        self.set_refresh_on_hit(self.defaults.refresh_on_hit);
    }

    /// Waits until every background refresh has finished.
    pub async fn wait_for_refreshes(&self) {
        self.context.offload.wait_all().await;
    }

    /// Like [`Replay::wait_for_refreshes`], giving up after `timeout`.
    ///
    /// Returns `false` on timeout; the refreshes keep running.
    pub async fn wait_for_refreshes_timeout(&self, timeout: Duration) -> bool {
        self.context.offload.wait_all_timeout(timeout).await
    }
}

impl<F> Clone for Replay<F> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            defaults: self.defaults,
        }
    }
}

impl<F> std::fmt::Debug for Replay<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Replay")
            .field("cache", &self.context.cache)
            .field("refresh_on_hit", &self.refresh_on_hit())
            .field("offload", &self.context.offload)
            .finish_non_exhaustive()
    }
}

impl<F> TransportFactory for Replay<F>
where
    F: TransportFactory,
{
    type Transport = RequestProxy<F>;

    fn create(&self) -> Self::Transport {
        RequestProxy::new(self.context.clone())
    }
}

/// Builder for [`Replay`].
pub struct ReplayBuilder<F> {
    original: F,
    config: ReplayConfig,
    store: Option<Arc<dyn Store>>,
}

impl<F> ReplayBuilder<F>
where
    F: TransportFactory,
{
    fn new(original: F) -> Self {
        Self {
            original,
            config: ReplayConfig::default(),
            store: None,
        }
    }

    /// Replaces every setting at once.
    pub fn config(self, config: ReplayConfig) -> Self {
        Self { config, ..self }
    }

    /// Uses `store` instead of the configured one.
    pub fn store(self, store: Arc<dyn Store>) -> Self {
        Self {
            store: Some(store),
            ..self
        }
    }

    /// Tag prepended to every cache key.
    pub fn namespace(mut self, namespace: impl Into<SmolStr>) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Starts with the cache bypassed.
    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.config.no_cache = no_cache;
        self
    }

    /// Refresh cache hits from the network.
    pub fn refresh_on_hit(mut self, refresh: bool) -> Self {
        self.config.refresh_on_hit = refresh;
        self
    }

    /// Background refresh settings.
    pub fn offload(mut self, offload: OffloadConfig) -> Self {
        self.config.offload = offload;
        self
    }

    /// Builds the replay around the explicit [`store`](Self::store), or an
    /// unshared [`MemoryStore`] with the default capacity.
    ///
    /// The `store` section of the configuration is only honored by
    /// [`try_build`](Self::try_build).
    pub fn build(self) -> Replay<F> {
        let store: Arc<dyn Store> = match &self.store {
            Some(store) => store.clone(),
            None => Arc::new(MemoryStore::new()),
        };
        self.finish(store)
    }

    /// Builds the replay, opening the configured store unless an explicit
    /// one was supplied.
    pub fn try_build(self) -> Result<Replay<F>, ConfigError> {
        let store: Arc<dyn Store> = match &self.store {
            Some(store) => store.clone(),
            None => self.config.store.clone().into_store()?,
        };
        Ok(self.finish(store))
    }

    fn finish(self, store: Arc<dyn Store>) -> Replay<F> {
        let config = self.config;
        let cache = ResponseCache::new(store).with_namespace(config.namespace.clone());
        if config.no_cache {
            cache.disable();
        }

        debug!(
            namespace = %config.namespace,
            store = cache.store().name(),
            no_cache = config.no_cache,
            refresh_on_hit = config.refresh_on_hit,
            "replay configured"
        );

        Replay {
            context: Arc::new(ReplayContext {
                original: Arc::new(self.original),
                cache: Arc::new(cache),
                offload: OffloadManager::new(config.offload),
                refresh_on_hit: AtomicBool::new(config.refresh_on_hit),
            }),
            defaults: Toggles {
                no_cache: config.no_cache,
                refresh_on_hit: config.refresh_on_hit,
            },
        }
    }
}
