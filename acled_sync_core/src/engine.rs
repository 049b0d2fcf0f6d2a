use crate::batch;
use crate::config::StoreCredentials;
use crate::feeds::Feed;
use crate::models::{
    EditSummary, Feature, FeedOutcome, PhaseSummary, RunReport, Session, SyncTrigger,
};
use crate::recency::{self, RecencyWindow};
use crate::store::FeatureStore;
use crate::Result;
use chrono::Utc;
use std::num::NonZeroUsize;
use std::sync::Arc;
use uuid::Uuid;

/// Full-refresh sync orchestrator.
///
/// One `run` replaces the entire layer: authenticate, fetch and normalize
/// both feeds, delete every existing feature in batches, insert the combined
/// feature list in batches. Stages after authentication are independent
/// failure domains; their errors are logged and folded into the
/// [`RunReport`] instead of propagating.
pub struct SyncEngine {
    global: Arc<dyn Feed>,
    region: Arc<dyn Feed>,
    store: Arc<dyn FeatureStore>,
    credentials: StoreCredentials,
    lookback_days: u32,
    batch_size: NonZeroUsize,
}

impl SyncEngine {
    pub fn new(
        global: Arc<dyn Feed>,
        region: Arc<dyn Feed>,
        store: Arc<dyn FeatureStore>,
        credentials: StoreCredentials,
        lookback_days: u32,
        batch_size: NonZeroUsize,
    ) -> Self {
        Self {
            global,
            region,
            store,
            credentials,
            lookback_days,
            batch_size,
        }
    }

    /// Execute one full resync.
    ///
    /// Returns `Err` only when session construction fails; every later stage
    /// reports through the `RunReport`.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn run(&self, trigger: SyncTrigger) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        if matches!(trigger, SyncTrigger::Scheduled { past_due: true }) {
            tracing::warn!(%run_id, "scheduled invocation is past due");
        }
        tracing::info!(%run_id, "acled live update initiated");

        let session = Session::new(&self.credentials)?;
        let window = RecencyWindow::trailing(started_at, self.lookback_days);

        let (global_features, global_outcome) = self.fetch_feed(self.global.as_ref(), &window).await;

        let (region_features, mut region_outcome) =
            self.fetch_feed(self.region.as_ref(), &window).await;
        // The global feed is filtered server-side by the cutoff query param;
        // the region artifact is not, so the window applies here.
        let region_features = recency::retain_recent(region_features, &window);
        region_outcome.features = region_features.len();

        if global_features.is_empty() && region_features.is_empty() {
            tracing::info!(%run_id, "acled update completed; no data returned for both feeds");
            let finished_at = Utc::now();
            return Ok(RunReport {
                run_id,
                trigger,
                started_at,
                finished_at,
                global: global_outcome,
                region: region_outcome,
                deleted: PhaseSummary::default(),
                inserted: PhaseSummary::default(),
                skipped: true,
            });
        }

        // Global first, then region, so reruns over the same inputs produce
        // the same insert order.
        let mut features = global_features;
        features.extend(region_features);

        let deleted = self.delete_phase(&session).await;
        let inserted = self.insert_phase(&session, &features).await;

        tracing::info!(%run_id, added = inserted.succeeded, "successfully added features");
        tracing::info!(%run_id, "acled live update completed");

        Ok(RunReport {
            run_id,
            trigger,
            started_at,
            finished_at: Utc::now(),
            global: global_outcome,
            region: region_outcome,
            deleted,
            inserted,
            skipped: false,
        })
    }

    /// Operator-driven whole-layer reset via the store's match-all delete.
    #[tracing::instrument(level = "info", skip(self))]
    pub async fn reset(&self) -> Result<EditSummary> {
        let session = Session::new(&self.credentials)?;
        let summary = self.store.delete_all(&session).await?;
        tracing::info!(deleted = summary.succeeded, "layer reset complete");
        Ok(summary)
    }

    async fn fetch_feed(
        &self,
        feed: &dyn Feed,
        window: &RecencyWindow,
    ) -> (Vec<Feature>, FeedOutcome) {
        match feed.fetch(window).await {
            Ok(features) => {
                tracing::info!(feed = feed.id(), count = features.len(), "feed fetched");
                let outcome = FeedOutcome {
                    features: features.len(),
                    error: None,
                };
                (features, outcome)
            }
            Err(e) => {
                tracing::warn!(feed = feed.id(), error = %e, "feed failed; contributing no records");
                (
                    Vec::new(),
                    FeedOutcome {
                        features: 0,
                        error: Some(e.to_string()),
                    },
                )
            }
        }
    }

    async fn delete_phase(&self, session: &Session) -> PhaseSummary {
        let ids = match self.store.query_object_ids(session).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(error = %e, "object id query failed; skipping delete phase");
                return PhaseSummary {
                    error: Some(e.to_string()),
                    ..Default::default()
                };
            }
        };

        let total = ids.len().div_ceil(self.batch_size.get());
        let mut summary = PhaseSummary::default();
        for (i, chunk) in batch::chunks(&ids, self.batch_size).enumerate() {
            tracing::info!(batch = i + 1, of = total, len = chunk.len(), "deleting batch");
            summary.batches += 1;
            match self.store.delete_features(session, chunk).await {
                Ok(result) => summary.succeeded += result.succeeded,
                Err(e) => {
                    tracing::warn!(batch = i + 1, error = %e, "delete batch failed");
                    summary.failed_batches += 1;
                    summary.error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        tracing::info!(deleted = summary.succeeded, "delete phase complete");
        summary
    }

    async fn insert_phase(&self, session: &Session, features: &[Feature]) -> PhaseSummary {
        let total = features.len().div_ceil(self.batch_size.get());
        let mut summary = PhaseSummary::default();
        for (i, chunk) in batch::chunks(features, self.batch_size).enumerate() {
            tracing::info!(batch = i + 1, of = total, len = chunk.len(), "inserting batch");
            summary.batches += 1;
            match self.store.add_features(session, chunk).await {
                Ok(result) => summary.succeeded += result.succeeded,
                Err(e) => {
                    tracing::warn!(batch = i + 1, error = %e, "insert batch failed");
                    summary.failed_batches += 1;
                    summary.error.get_or_insert_with(|| e.to_string());
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventAttributes, Geometry};
    use crate::store::ObjectId;
    use crate::Error;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn recent_feature() -> Feature {
        Feature {
            geometry: Geometry { x: 30.5, y: 50.4 },
            attributes: EventAttributes {
                event_date: Utc::now().date_naive().format("%Y-%m-%d").to_string(),
                ..Default::default()
            },
        }
    }

    fn credentials() -> StoreCredentials {
        StoreCredentials {
            username: "svc".to_string(),
            password: "pass".to_string(),
        }
    }

    struct FakeFeed {
        id: &'static str,
        features: Option<Vec<Feature>>,
    }

    impl FakeFeed {
        fn ok(id: &'static str, n: usize) -> Self {
            Self {
                id,
                features: Some(vec![recent_feature(); n]),
            }
        }

        fn failing(id: &'static str) -> Self {
            Self { id, features: None }
        }
    }

    #[async_trait]
    impl Feed for FakeFeed {
        fn id(&self) -> &'static str {
            self.id
        }

        async fn fetch(&self, _window: &RecencyWindow) -> Result<Vec<Feature>> {
            match &self.features {
                Some(features) => Ok(features.clone()),
                None => Err(Error::feed_parse(self.id, "boom")),
            }
        }
    }

    #[derive(Default)]
    struct FakeStore {
        existing: Vec<ObjectId>,
        fail_query: bool,
        fail_delete_batch: Option<usize>,
        query_calls: AtomicUsize,
        delete_batch_sizes: Mutex<Vec<usize>>,
        insert_batch_sizes: Mutex<Vec<usize>>,
        delete_all_calls: AtomicUsize,
    }

    impl FakeStore {
        fn with_existing(n: usize) -> Self {
            Self {
                existing: (1..=n as ObjectId).collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl FeatureStore for FakeStore {
        async fn query_object_ids(&self, _session: &Session) -> Result<Vec<ObjectId>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_query {
                return Err(Error::store_query(
                    "query object ids",
                    std::io::Error::other("transport down"),
                ));
            }
            Ok(self.existing.clone())
        }

        async fn delete_features(
            &self,
            _session: &Session,
            ids: &[ObjectId],
        ) -> Result<EditSummary> {
            let mut sizes = self.delete_batch_sizes.lock().unwrap();
            let index = sizes.len();
            sizes.push(ids.len());
            if self.fail_delete_batch == Some(index) {
                return Err(Error::store_write(
                    "delete features",
                    std::io::Error::other("write refused"),
                ));
            }
            Ok(EditSummary {
                succeeded: ids.len(),
                failed: 0,
            })
        }

        async fn delete_all(&self, _session: &Session) -> Result<EditSummary> {
            self.delete_all_calls.fetch_add(1, Ordering::SeqCst);
            Ok(EditSummary {
                succeeded: self.existing.len(),
                failed: 0,
            })
        }

        async fn add_features(
            &self,
            _session: &Session,
            features: &[Feature],
        ) -> Result<EditSummary> {
            self.insert_batch_sizes.lock().unwrap().push(features.len());
            Ok(EditSummary {
                succeeded: features.len(),
                failed: 0,
            })
        }
    }

    fn engine(global: FakeFeed, region: FakeFeed, store: Arc<FakeStore>) -> SyncEngine {
        SyncEngine::new(
            Arc::new(global),
            Arc::new(region),
            store,
            credentials(),
            14,
            NonZeroUsize::new(500).unwrap(),
        )
    }

    #[tokio::test]
    async fn full_resync_batches_deletes_and_inserts() {
        let store = Arc::new(FakeStore::with_existing(1_200));
        let eng = engine(
            FakeFeed::ok("global", 500),
            FakeFeed::ok("region", 300),
            store.clone(),
        );

        let report = eng.run(SyncTrigger::OnDemand).await.unwrap();

        assert_eq!(
            *store.delete_batch_sizes.lock().unwrap(),
            vec![500, 500, 200]
        );
        assert_eq!(*store.insert_batch_sizes.lock().unwrap(), vec![500, 300]);
        assert_eq!(report.inserted.succeeded, 800);
        assert_eq!(report.deleted.succeeded, 1_200);
        assert!(!report.skipped);
        assert_eq!(report.global.features, 500);
        assert_eq!(report.region.features, 300);
    }

    #[tokio::test]
    async fn both_feeds_empty_short_circuits_without_store_calls() {
        let store = Arc::new(FakeStore::with_existing(10));
        let eng = engine(
            FakeFeed::ok("global", 0),
            FakeFeed::ok("region", 0),
            store.clone(),
        );

        let report = eng.run(SyncTrigger::Scheduled { past_due: false }).await.unwrap();

        assert!(report.skipped);
        assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
        assert!(store.delete_batch_sizes.lock().unwrap().is_empty());
        assert!(store.insert_batch_sizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_global_feed_still_syncs_region_records() {
        let store = Arc::new(FakeStore::with_existing(10));
        let eng = engine(
            FakeFeed::failing("global"),
            FakeFeed::ok("region", 3),
            store.clone(),
        );

        let report = eng.run(SyncTrigger::OnDemand).await.unwrap();

        assert!(report.global.error.is_some());
        assert_eq!(report.global.features, 0);
        assert_eq!(*store.insert_batch_sizes.lock().unwrap(), vec![3]);
        assert_eq!(report.inserted.succeeded, 3);
        assert!(!report.skipped);
    }

    #[tokio::test]
    async fn stale_region_records_are_filtered_out() {
        let mut stale = recent_feature();
        stale.attributes.event_date = "2001-01-01".to_string();
        let region = FakeFeed {
            id: "region",
            features: Some(vec![stale]),
        };
        let store = Arc::new(FakeStore::with_existing(0));
        let eng = engine(FakeFeed::ok("global", 0), region, store.clone());

        let report = eng.run(SyncTrigger::OnDemand).await.unwrap();

        assert_eq!(report.region.features, 0);
        assert!(report.skipped);
    }

    #[tokio::test]
    async fn query_failure_skips_delete_but_insert_still_runs() {
        let store = Arc::new(FakeStore {
            fail_query: true,
            ..FakeStore::with_existing(1_000)
        });
        let eng = engine(
            FakeFeed::ok("global", 2),
            FakeFeed::ok("region", 0),
            store.clone(),
        );

        let report = eng.run(SyncTrigger::OnDemand).await.unwrap();

        assert!(report.deleted.error.is_some());
        assert_eq!(report.deleted.batches, 0);
        assert_eq!(*store.insert_batch_sizes.lock().unwrap(), vec![2]);
        assert_eq!(report.inserted.succeeded, 2);
    }

    #[tokio::test]
    async fn failed_delete_batch_does_not_stop_remaining_batches() {
        let store = Arc::new(FakeStore {
            fail_delete_batch: Some(1),
            ..FakeStore::with_existing(1_200)
        });
        let eng = engine(
            FakeFeed::ok("global", 1),
            FakeFeed::ok("region", 0),
            store.clone(),
        );

        let report = eng.run(SyncTrigger::OnDemand).await.unwrap();

        assert_eq!(store.delete_batch_sizes.lock().unwrap().len(), 3);
        assert_eq!(report.deleted.batches, 3);
        assert_eq!(report.deleted.failed_batches, 1);
        assert_eq!(report.deleted.succeeded, 700);
        assert!(report.deleted.error.is_some());
        assert_eq!(report.inserted.succeeded, 1);
    }

    #[tokio::test]
    async fn empty_credentials_abort_before_any_fetch() {
        let store = Arc::new(FakeStore::with_existing(10));
        let eng = SyncEngine::new(
            Arc::new(FakeFeed::ok("global", 1)),
            Arc::new(FakeFeed::ok("region", 1)),
            store.clone(),
            StoreCredentials {
                username: String::new(),
                password: "pass".to_string(),
            },
            14,
            NonZeroUsize::new(500).unwrap(),
        );

        let err = eng.run(SyncTrigger::OnDemand).await.unwrap_err();
        assert!(matches!(err, Error::AuthSetup(_)));
        assert_eq!(store.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reset_issues_one_match_all_delete() {
        let store = Arc::new(FakeStore::with_existing(42));
        let eng = engine(
            FakeFeed::ok("global", 0),
            FakeFeed::ok("region", 0),
            store.clone(),
        );

        let summary = eng.reset().await.unwrap();
        assert_eq!(summary.succeeded, 42);
        assert_eq!(store.delete_all_calls.load(Ordering::SeqCst), 1);
    }
}
