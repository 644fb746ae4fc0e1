//! Read-view cache invalidation
//!
//! After a successful mutation every read view that could show the country
//! is marked stale: the global aggregates as well as the country-scoped
//! views. This over-invalidates on purpose; precision is not a goal.
//!
//! The invalidator is injected into the orchestrator, so tests can swap in a
//! recording or no-op implementation.

use crate::config::EngineConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use visa_model::CountryId;

/// Logical read views that depend on package or document data
///
/// `None` is the global (all-countries) variant of a scoped view.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "view", content = "country", rename_all = "snake_case")]
pub enum ViewKey {
    /// Aggregate country list
    Countries,
    /// Popular destinations aggregate
    PopularDestinations,
    /// Country detail page data
    CountryDetail(Option<CountryId>),
    /// Package for a country
    CountryPackage(Option<CountryId>),
    /// Document checklist for a country
    CountryDocuments(Option<CountryId>),
}

impl ViewKey {
    /// Every view a change to `country_id` can make stale
    #[must_use]
    pub fn affected_by(country_id: &CountryId) -> Vec<ViewKey> {
        let scoped = Some(country_id.clone());
        vec![
            ViewKey::Countries,
            ViewKey::PopularDestinations,
            ViewKey::CountryDetail(None),
            ViewKey::CountryPackage(None),
            ViewKey::CountryDocuments(None),
            ViewKey::CountryDetail(scoped.clone()),
            ViewKey::CountryPackage(scoped.clone()),
            ViewKey::CountryDocuments(scoped),
        ]
    }

    /// Not tied to a single country
    #[inline]
    #[must_use]
    pub fn is_global(&self) -> bool {
        match self {
            ViewKey::Countries | ViewKey::PopularDestinations => true,
            ViewKey::CountryDetail(c) | ViewKey::CountryPackage(c) | ViewKey::CountryDocuments(c) => {
                c.is_none()
            }
        }
    }
}

/// Published after each invalidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Country whose data changed
    pub country_id: CountryId,
    /// Views marked stale
    pub keys: Vec<ViewKey>,
    /// When it happened
    pub at: DateTime<Utc>,
}

/// Signals dependent read views that their data is stale
#[async_trait]
pub trait CacheInvalidator: Send + Sync + std::fmt::Debug {
    /// Mark every view affected by `country_id` as stale
    async fn invalidate(&self, country_id: &CountryId);
}

/// Does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopInvalidator;

#[async_trait]
impl CacheInvalidator for NoopInvalidator {
    async fn invalidate(&self, _country_id: &CountryId) {}
}

/// Cache of rendered read views, keyed by [`ViewKey`]
///
/// Consumers cache what they load through [`ReadViewCache::get_or_load`] and
/// can follow invalidations with [`ReadViewCache::subscribe`].
#[derive(Debug, Clone)]
pub struct ReadViewCache {
    views: Cache<ViewKey, Arc<Value>>,
    events: broadcast::Sender<InvalidationEvent>,
}

impl ReadViewCache {
    /// Create cache with capacity, optional TTL and event buffer size
    #[must_use]
    pub fn new(max_capacity: u64, ttl: Option<Duration>, channel_capacity: usize) -> Self {
        let mut builder = Cache::builder().max_capacity(max_capacity);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        let (events, _) = broadcast::channel(channel_capacity.max(1));
        Self {
            views: builder.build(),
            events,
        }
    }

    /// Create cache from engine configuration
    #[inline]
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.view_cache_capacity,
            config.view_cache_ttl(),
            config.invalidation_channel_capacity,
        )
    }

    /// Cached view, if fresh
    #[inline]
    pub async fn get(&self, key: &ViewKey) -> Option<Arc<Value>> {
        self.views.get(key).await
    }

    /// Store a view
    #[inline]
    pub async fn insert(&self, key: ViewKey, value: Value) {
        self.views.insert(key, Arc::new(value)).await;
    }

    /// Cached view, or load and cache it
    ///
    /// # Errors
    /// Whatever `load` returns; nothing is cached on error.
    pub async fn get_or_load<E, F, Fut>(&self, key: ViewKey, load: F) -> Result<Arc<Value>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, E>>,
    {
        if let Some(cached) = self.views.get(&key).await {
            return Ok(cached);
        }
        let value = Arc::new(load().await?);
        self.views.insert(key, Arc::clone(&value)).await;
        Ok(value)
    }

    /// Whether a view is currently cached
    #[inline]
    pub async fn contains(&self, key: &ViewKey) -> bool {
        self.views.get(key).await.is_some()
    }

    /// Follow invalidations
    #[inline]
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<InvalidationEvent> {
        self.events.subscribe()
    }
}

impl Default for ReadViewCache {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait]
impl CacheInvalidator for ReadViewCache {
    async fn invalidate(&self, country_id: &CountryId) {
        let keys = ViewKey::affected_by(country_id);
        for key in &keys {
            self.views.invalidate(key).await;
        }
        tracing::debug!(country = %country_id, views = keys.len(), "read views invalidated");

        let event = InvalidationEvent {
            country_id: country_id.clone(),
            keys,
            at: Utc::now(),
        };
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
