//! Catalog cache: the one piece of shared mutable state in the service.
//!
//! Readers clone an `Arc<CatalogSnapshot>` out of a short read lock and never
//! wait on a load. Loads are single-flight: the first caller spawns the
//! upstream fetch and parks a shared handle to it; everyone arriving while it
//! runs awaits that same handle. The fetch runs on its own task, so a webhook
//! that gives up at its response budget does not cancel it; the next request
//! finds the cache warm.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, try_join_all};
use tracing::{info, warn};

use report_common::{CatalogSnapshot, FactoryId};

use crate::data::DataService;
use crate::errors::CatalogError;

type LoadResult = Result<Arc<CatalogSnapshot>, CatalogError>;
type InFlight = Shared<BoxFuture<'static, LoadResult>>;

/// Fetch a complete snapshot: common lists plus every factory's machine sheet.
///
/// Any failed call fails the whole load; a partial snapshot is never built.
pub async fn load_snapshot(
    source: &dyn DataService,
    factories: &[FactoryId],
) -> Result<CatalogSnapshot, CatalogError> {
    let lists = source.common_lists().await?;
    let sheets = try_join_all(factories.iter().map(|factory| async move {
        source
            .machine_products(factory)
            .await
            .map(|products| (factory.clone(), products))
    }))
    .await?;

    Ok(CatalogSnapshot {
        reporters: lists.names,
        defect_categories: lists.defects,
        machines_by_factory: sheets.into_iter().collect::<BTreeMap<_, _>>(),
    })
}

pub struct CatalogCache {
    source: Arc<dyn DataService>,
    factories: Arc<[FactoryId]>,
    current: Arc<RwLock<Option<Arc<CatalogSnapshot>>>>,
    in_flight: Arc<Mutex<Option<InFlight>>>,
    load_budget: Duration,
}

impl CatalogCache {
    /// `load_budget` bounds how long a caller of [`get_or_load`](Self::get_or_load)
    /// or [`refresh`](Self::refresh) waits before falling back.
    pub fn new(
        source: Arc<dyn DataService>,
        factories: Vec<FactoryId>,
        load_budget: Duration,
    ) -> Self {
        Self {
            source,
            factories: factories.into(),
            current: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(Mutex::new(None)),
            load_budget,
        }
    }

    /// The last successfully loaded snapshot, if any.
    pub fn current(&self) -> Option<Arc<CatalogSnapshot>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Load from upstream, joining a load already in flight.
    pub async fn load(&self) -> LoadResult {
        self.in_flight_load().await
    }

    /// The cached snapshot, loading it on first use.
    ///
    /// Never fails: if upstream is down or slower than the load budget, the
    /// last good snapshot or an empty one is returned.
    pub async fn get_or_load(&self) -> Arc<CatalogSnapshot> {
        if let Some(snapshot) = self.current() {
            return snapshot;
        }
        self.load_within_budget().await
    }

    /// Reload after a submission; keeps the previous snapshot on failure.
    pub async fn refresh(&self) -> Arc<CatalogSnapshot> {
        self.load_within_budget().await
    }

    async fn load_within_budget(&self) -> Arc<CatalogSnapshot> {
        match tokio::time::timeout(self.load_budget, self.load()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!(error = %e, "catalog unavailable, rendering from fallback");
                self.fallback()
            }
            Err(_) => {
                warn!(
                    budget_ms = self.load_budget.as_millis() as u64,
                    "catalog load exceeded response budget, rendering from fallback"
                );
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Arc<CatalogSnapshot> {
        self.current()
            .unwrap_or_else(|| Arc::new(CatalogSnapshot::empty()))
    }

    fn in_flight_load(&self) -> InFlight {
        let mut slot = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = slot.as_ref() {
            return existing.clone();
        }

        let source = Arc::clone(&self.source);
        let factories = Arc::clone(&self.factories);
        let current = Arc::clone(&self.current);
        let in_flight = Arc::clone(&self.in_flight);

        // The slot lock is held until the handle is parked, so the task's
        // final clear always observes it.
        let handle = tokio::spawn(async move {
            let result = load_snapshot(source.as_ref(), &factories)
                .await
                .map(Arc::new);
            match &result {
                Ok(snapshot) => {
                    *current.write().unwrap_or_else(|poisoned| poisoned.into_inner()) =
                        Some(Arc::clone(snapshot));
                    info!(
                        reporters = snapshot.reporters.len(),
                        defects = snapshot.defect_categories.len(),
                        factories = snapshot.machines_by_factory.len(),
                        "catalog loaded"
                    );
                }
                Err(e) => warn!(error = %e, "catalog load failed"),
            }
            *in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
            result
        });

        let shared = async move {
            handle.await.unwrap_or_else(|e| {
                Err(CatalogError::UpstreamUnavailable(format!(
                    "catalog load task failed: {}",
                    e
                )))
            })
        }
        .boxed()
        .shared();

        *slot = Some(shared.clone());
        shared
    }
}
