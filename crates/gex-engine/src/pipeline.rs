//! Refresh pipeline: fetch, sample, aggregate, analyse, record.

use crate::aggregator::{select_expiry, ExpirySelection, StrikeAggregator};
use crate::analyzer::analyze;
use crate::cache::TtlCache;
use crate::error::GexError;
use crate::greeks::{BlackScholesGreeks, ExchangeGreeks, GreeksModel, SkipReason};
use crate::history::{HistoryPoint, HistoryStore};
use crate::report::GexReport;
use crate::sampler::{collect_samples, SampleOptions};
use crate::types::{GexSnapshot, WeightedView, Weighting};
use crate::Result;
use chrono::{DateTime, Utc};
use market_data::{SnapshotProvider, TickerProvider};
use observability::PipelineMetrics;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Tunables for a [`GexPipeline`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub aggregator: StrikeAggregator,
    pub sampling: SampleOptions,
    pub cache_ttl: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            aggregator: StrikeAggregator::default(),
            sampling: SampleOptions::default(),
            cache_ttl: Duration::from_secs(30),
        }
    }
}

impl PipelineSettings {
    /// Settings for an engine section.
    ///
    /// Rejects values that would make every cycle degenerate, even when the
    /// section never went through the config validator.
    pub fn from_config(engine: &config::EngineSection) -> Result<Self> {
        if !(engine.scaling_constant.is_finite() && engine.scaling_constant >= 0.0) {
            return Err(GexError::Config(format!(
                "scaling_constant must be finite and non-negative, got {}",
                engine.scaling_constant
            )));
        }
        if engine.fetch_concurrency == 0 {
            return Err(GexError::Config("fetch_concurrency must be positive".into()));
        }
        if engine.cache_ttl_seconds == 0 {
            return Err(GexError::Config("cache_ttl_seconds must be positive".into()));
        }

        let expiry_selection = match engine.expiry_selection {
            config::ExpirySelection::Nearest => ExpirySelection::Nearest,
            config::ExpirySelection::Nth(k) => ExpirySelection::Nth(k),
        };

        Ok(Self {
            aggregator: StrikeAggregator::new(engine.scaling_constant, expiry_selection),
            sampling: SampleOptions {
                concurrency: engine.fetch_concurrency,
                fetch_timeout: Duration::from_millis(engine.fetch_timeout_ms),
            },
            cache_ttl: Duration::from_secs(engine.cache_ttl_seconds),
        })
    }
}

/// Greeks model named by configuration.
pub fn greeks_model(engine: &config::EngineSection) -> Arc<dyn GreeksModel> {
    match engine.greeks_source {
        config::GreeksSourceKind::BlackScholes => Arc::new(BlackScholesGreeks::new(engine.risk_free_rate)),
        config::GreeksSourceKind::Exchange => Arc::new(ExchangeGreeks),
    }
}

/// Owns the providers, the history and the cache for one asset universe.
pub struct GexPipeline {
    snapshots: Arc<dyn SnapshotProvider>,
    tickers: Arc<dyn TickerProvider>,
    model: Arc<dyn GreeksModel>,
    history: Arc<dyn HistoryStore>,
    settings: PipelineSettings,
    cache: TtlCache<String, Arc<GexReport>>,
    metrics: PipelineMetrics,
}

impl GexPipeline {
    pub fn new(
        snapshots: Arc<dyn SnapshotProvider>,
        tickers: Arc<dyn TickerProvider>,
        model: Arc<dyn GreeksModel>,
        history: Arc<dyn HistoryStore>,
        settings: PipelineSettings,
        metrics: PipelineMetrics,
    ) -> Self {
        Self {
            snapshots,
            tickers,
            model,
            history,
            cache: TtlCache::new(settings.cache_ttl),
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn history_store(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    /// Run one uncached cycle as of `now`. Does not touch the history.
    #[instrument(skip(self, now), fields(model = self.model.name()))]
    pub async fn compute_at(&self, asset: &str, now: DateTime<Utc>) -> Result<GexSnapshot> {
        let asset = asset.to_uppercase();

        let (instruments, spot) = tokio::try_join!(
            self.snapshots.instruments(&asset),
            self.snapshots.spot_price(&asset)
        )
        .map_err(|e| GexError::upstream(&asset, e))?;

        if !(spot.is_finite() && spot > 0.0) {
            return Err(GexError::InvalidSpotPrice { asset, price: spot });
        }

        let aggregator = self.settings.aggregator;
        let expiry = select_expiry(&instruments, aggregator.expiry_selection);

        let listed = instruments.len();
        let mut no_expiry = 0;
        let candidates: Vec<_> = instruments
            .into_iter()
            .filter(|i| match i.expiration_timestamp {
                None => {
                    debug!(instrument = %i.instrument_name, reason = %SkipReason::NoExpiry, "instrument skipped");
                    no_expiry += 1;
                    false
                }
                some => some == expiry,
            })
            .collect();

        let batch = collect_samples(
            candidates,
            self.tickers.as_ref(),
            self.model.as_ref(),
            spot,
            now.timestamp_millis(),
            self.settings.sampling,
        )
        .await;

        let by_oi = aggregator.aggregate(&batch.samples, spot, Weighting::OpenInterest);
        let by_volume = aggregator.aggregate(&batch.samples, spot, Weighting::Volume);

        let dropped: HashSet<&str> = by_oi.skipped.iter().map(|(name, _)| name.as_str()).collect();
        let retained: Vec<_> = batch
            .samples
            .iter()
            .filter(|s| !dropped.contains(s.instrument.instrument_name.as_str()))
            .cloned()
            .collect();
        let activity = aggregator.activity(&retained, expiry);

        let processed = retained.len();
        let skipped = no_expiry + batch.skipped_count() + dropped.len();

        let open_interest = WeightedView {
            analysis: analyze(&by_oi.curve, spot),
            curve: by_oi.curve,
        };
        let volume = WeightedView {
            analysis: analyze(&by_volume.curve, spot),
            curve: by_volume.curve,
        };

        let snapshot = GexSnapshot {
            asset,
            spot_price: spot,
            expiration_timestamp: expiry,
            open_interest,
            volume,
            activity,
            processed,
            skipped,
            computed_at: now,
        };

        info!(
            asset = %snapshot.asset,
            listed,
            processed,
            skipped,
            expiry = ?snapshot.expiration_date(),
            net_oi_gex = snapshot.net_gex(),
            zero_gamma = ?snapshot.open_interest.analysis.zero_gamma,
            "GEX computed"
        );

        Ok(snapshot)
    }

    /// Compute, record and report, memoized per asset for the cache TTL.
    ///
    /// Momentum is taken against the history before the new entry is
    /// recorded. A failure leaves the asset's slot empty, so the next caller
    /// queued on it retries while later callers keep queueing behind it.
    pub async fn refresh(&self, asset: &str) -> Result<Arc<GexReport>> {
        let key = asset.to_uppercase();
        let this = self;
        let asset_ref = key.as_str();

        let outcome = self
            .cache
            .get_or_try_insert_with(key.clone(), move || async move {
                let _timer = this.metrics.start_timer(asset_ref);
                let now = Utc::now();

                let snapshot = Arc::new(this.compute_at(asset_ref, now).await?);
                let momentum = this.history.momentum(asset_ref, snapshot.net_gex(), now).await;
                this.history.record(asset_ref, Arc::clone(&snapshot), now).await;

                this.metrics.record_refresh(
                    asset_ref,
                    snapshot.processed,
                    snapshot.skipped,
                    Some(snapshot.net_gex()),
                );
                Ok::<_, GexError>(Arc::new(GexReport::from_snapshot(&snapshot, momentum)))
            })
            .await;

        match outcome {
            Ok(cached) => {
                if cached.hit {
                    self.metrics.record_cache_hit(&key);
                }
                Ok(cached.value)
            }
            Err(e) => {
                self.metrics.record_failure(&key, e.kind());
                warn!(asset = %key, error = %e, "GEX refresh failed");
                Err(e)
            }
        }
    }

    /// Like [`refresh`](Self::refresh) but renders failures as an error record.
    pub async fn report(&self, asset: &str) -> Arc<GexReport> {
        match self.refresh(asset).await {
            Ok(report) => report,
            Err(e) => Arc::new(GexReport::failed(&asset.to_uppercase(), &e, Utc::now())),
        }
    }

    pub async fn history(&self, asset: &str) -> Vec<HistoryPoint> {
        self.history.points(&asset.to_uppercase()).await
    }

    pub fn invalidate(&self, asset: &str) {
        self.cache.invalidate(&asset.to_uppercase());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistoryStore;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use market_data::{Instrument, MarketDataError, OptionType, StaticMarketData, Ticker};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_test::{assert_err, assert_ok};

    mock! {
        pub Snapshots {}

        #[async_trait]
        impl SnapshotProvider for Snapshots {
            async fn instruments(&self, currency: &str) -> market_data::Result<Vec<Instrument>>;
            async fn spot_price(&self, currency: &str) -> market_data::Result<f64>;
        }
    }

    const WEEK_MS: i64 = 7 * 24 * 3600 * 1000;

    fn expiry(now: DateTime<Utc>) -> i64 {
        now.timestamp_millis() + WEEK_MS
    }

    fn ticker(open_interest: f64, mark_iv: f64) -> Ticker {
        Ticker {
            open_interest,
            volume: open_interest / 10.0,
            mark_iv: Some(mark_iv),
            gamma: Some(0.00002),
        }
    }

    /// Three near-expiry BTC options, one of them quote-less, plus one far one.
    fn market(now: DateTime<Utc>) -> Arc<StaticMarketData> {
        let near = expiry(now);
        let market = StaticMarketData::new();
        market.set_spot_price("BTC", 60000.0);
        market.set_instruments(
            "BTC",
            vec![
                Instrument::new("BTC-N-55000-P", 55000.0, OptionType::Put, near),
                Instrument::new("BTC-N-60000-C", 60000.0, OptionType::Call, near),
                Instrument::new("BTC-N-65000-C", 65000.0, OptionType::Call, near),
                Instrument::new("BTC-F-60000-C", 60000.0, OptionType::Call, near + WEEK_MS),
            ],
        );
        market.set_ticker("BTC-N-55000-P", ticker(500.0, 60.0));
        market.set_ticker("BTC-N-60000-C", ticker(200.0, 55.0));
        market.set_ticker("BTC-N-65000-C", ticker(300.0, 0.0));
        market.set_ticker("BTC-F-60000-C", ticker(900.0, 50.0));
        Arc::new(market)
    }

    fn pipeline_with(snapshots: Arc<dyn SnapshotProvider>, tickers: Arc<dyn TickerProvider>) -> GexPipeline {
        GexPipeline::new(
            snapshots,
            tickers,
            Arc::new(BlackScholesGreeks::default()),
            Arc::new(InMemoryHistoryStore::default()),
            PipelineSettings::default(),
            PipelineMetrics::new("gexd-test"),
        )
    }

    fn pipeline(market: Arc<StaticMarketData>) -> GexPipeline {
        pipeline_with(market.clone(), market)
    }

    #[tokio::test]
    async fn test_partial_failure_isolation_end_to_end() {
        let now = Utc::now();
        let snapshot = pipeline(market(now)).compute_at("btc", now).await.unwrap();

        assert_eq!(snapshot.asset, "BTC");
        assert_eq!(snapshot.processed, 2);
        assert_eq!(snapshot.skipped, 1);
        assert_eq!(snapshot.expiration_timestamp, Some(expiry(now)));

        let strikes: Vec<f64> = snapshot.open_interest.curve.strikes().collect();
        assert_eq!(strikes, vec![55000.0, 60000.0]);

        let analysis = snapshot.open_interest.analysis;
        assert_eq!(analysis.call_wall, Some(60000.0));
        assert_eq!(analysis.put_wall, Some(55000.0));
        assert!(analysis.zero_gamma.is_some());
        assert!(analysis.total_put_gex < 0.0);
    }

    #[tokio::test]
    async fn test_exchange_model_uses_reported_gamma() {
        let now = Utc::now();
        let market = market(now);
        let pipeline = GexPipeline::new(
            market.clone(),
            market,
            Arc::new(ExchangeGreeks),
            Arc::new(InMemoryHistoryStore::default()),
            PipelineSettings::default(),
            PipelineMetrics::new("gexd-test"),
        );

        let snapshot = pipeline.compute_at("BTC", now).await.unwrap();
        // mark_iv is irrelevant to exchange Greeks
        assert_eq!(snapshot.processed, 3);
        assert_eq!(snapshot.skipped, 0);

        let expected = 0.00002 * 200.0 * 60000.0 * 60000.0 * 100.0 / 1e6;
        let call = snapshot.open_interest.curve.get(60000.0).unwrap().call_gex;
        assert!((call - expected).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_fatal() {
        let mut snapshots = MockSnapshots::new();
        snapshots
            .expect_instruments()
            .returning(|_| Err(MarketDataError::Connection("refused".into())));
        snapshots.expect_spot_price().returning(|_| Ok(60000.0));

        let pipeline = pipeline_with(Arc::new(snapshots), Arc::new(StaticMarketData::new()));
        let result = pipeline.compute_at("BTC", Utc::now()).await;

        assert_matches!(result, Err(GexError::UpstreamUnavailable { ref asset, .. }) if asset == "BTC");
    }

    #[tokio::test]
    async fn test_invalid_spot_price() {
        let mut snapshots = MockSnapshots::new();
        snapshots.expect_instruments().returning(|_| Ok(vec![]));
        snapshots.expect_spot_price().returning(|_| Ok(0.0));

        let pipeline = pipeline_with(Arc::new(snapshots), Arc::new(StaticMarketData::new()));
        let result = pipeline.compute_at("ETH", Utc::now()).await;

        assert_matches!(result, Err(GexError::InvalidSpotPrice { price, .. }) if price == 0.0);
    }

    #[tokio::test]
    async fn test_empty_chain_is_degenerate_not_error() {
        let mut snapshots = MockSnapshots::new();
        snapshots.expect_instruments().returning(|_| Ok(vec![]));
        snapshots.expect_spot_price().returning(|_| Ok(3000.0));

        let pipeline = pipeline_with(Arc::new(snapshots), Arc::new(StaticMarketData::new()));
        let snapshot = assert_ok!(pipeline.compute_at("ETH", Utc::now()).await);

        assert!(snapshot.open_interest.curve.is_empty());
        assert_eq!(snapshot.expiration_timestamp, None);
        assert_eq!(snapshot.open_interest.analysis.call_wall, None);
    }

    #[tokio::test]
    async fn test_failure_is_not_cached_and_next_call_retries() {
        let now = Utc::now();
        let near = expiry(now);
        let mut first = true;

        let mut snapshots = MockSnapshots::new();
        snapshots.expect_instruments().times(2).returning(move |_| {
            if first {
                first = false;
                Err(MarketDataError::Connection("timeout".into()))
            } else {
                Ok(vec![Instrument::new("BTC-N-60000-C", 60000.0, OptionType::Call, near)])
            }
        });
        snapshots.expect_spot_price().returning(|_| Ok(60000.0));

        let tickers = StaticMarketData::new();
        tickers.set_ticker("BTC-N-60000-C", ticker(10.0, 50.0));
        let pipeline = pipeline_with(Arc::new(snapshots), Arc::new(tickers));

        let failed = pipeline.report("BTC").await;
        assert!(failed.is_error());
        assert!(failed.data.is_empty());
        assert_eq!(failed.net_oi_gex, None);

        let ok = pipeline.report("BTC").await;
        assert!(!ok.is_error());
        assert_eq!(ok.data.len(), 1);
        assert_eq!(ok.call_wall, Some(60000.0));
    }

    #[tokio::test]
    async fn test_refresh_is_memoized() {
        let now = Utc::now();
        let mut snapshots = MockSnapshots::new();
        snapshots
            .expect_instruments()
            .times(1)
            .returning(move |_| Ok(vec![Instrument::new("X", 100.0, OptionType::Put, expiry(now))]));
        snapshots.expect_spot_price().times(1).returning(|_| Ok(100.0));

        let pipeline = pipeline_with(Arc::new(snapshots), Arc::new(StaticMarketData::new()));
        let first = assert_ok!(pipeline.refresh("BTC").await);
        let second = assert_ok!(pipeline.refresh("btc").await);

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.skipped_instruments, Some(1));
        assert_eq!(pipeline.history("BTC").await.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_records_history() {
        let now = Utc::now();
        let pipeline = pipeline(market(now));

        let report = assert_ok!(pipeline.refresh("BTC").await);
        assert_eq!(report.max_change_gex.one_min, None);

        let points = pipeline.history("btc").await;
        assert_eq!(points.len(), 1);
        assert_eq!(Some(points[0].net_oi_gex), report.net_oi_gex);

        pipeline.invalidate("BTC");
        assert_ok!(pipeline.refresh("BTC").await);
        assert_eq!(pipeline.history("BTC").await.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_asset_reports_error() {
        let pipeline = pipeline(market(Utc::now()));
        assert_err!(pipeline.refresh("SOL").await);

        let report = pipeline.report("sol").await;
        assert_eq!(report.currency, "SOL");
        assert!(report.error.as_deref().unwrap_or_default().contains("SOL"));
    }

    #[test]
    fn test_settings_from_config() {
        let mut engine = config::EngineSection::default();
        engine.expiry_selection = config::ExpirySelection::Nth(2);
        engine.fetch_concurrency = 4;
        engine.cache_ttl_seconds = 10;

        let settings = assert_ok!(PipelineSettings::from_config(&engine));
        assert_eq!(settings.aggregator.expiry_selection, ExpirySelection::Nth(2));
        assert_eq!(settings.sampling.concurrency, 4);
        assert_eq!(settings.cache_ttl, Duration::from_secs(10));
        assert_eq!(greeks_model(&engine).name(), "black_scholes");
    }

    #[test]
    fn test_settings_reject_degenerate_engine() {
        let mut engine = config::EngineSection::default();
        engine.scaling_constant = f64::NAN;
        assert_matches!(
            PipelineSettings::from_config(&engine),
            Err(GexError::Config(ref msg)) if msg.contains("scaling_constant")
        );

        engine.scaling_constant = 100.0;
        engine.fetch_concurrency = 0;
        let err = PipelineSettings::from_config(&engine).unwrap_err();
        assert_eq!(err.kind(), "config");

        engine.fetch_concurrency = 16;
        engine.cache_ttl_seconds = 0;
        assert_matches!(PipelineSettings::from_config(&engine), Err(GexError::Config(_)));
    }

    /// Counts concurrent `instruments` calls, each failing after a delay.
    #[derive(Default)]
    struct FlakySnapshots {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SnapshotProvider for FlakySnapshots {
        async fn instruments(&self, _currency: &str) -> market_data::Result<Vec<Instrument>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Err(MarketDataError::Connection("refused".into()))
        }

        async fn spot_price(&self, _currency: &str) -> market_data::Result<f64> {
            Ok(60000.0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_refresh_stays_single_flight() {
        let snapshots = Arc::new(FlakySnapshots::default());
        let pipeline = Arc::new(pipeline_with(snapshots.clone(), Arc::new(StaticMarketData::new())));

        let spawn_refresh = |pipeline: &Arc<GexPipeline>| {
            let pipeline = Arc::clone(pipeline);
            tokio::spawn(async move { pipeline.refresh("BTC").await })
        };

        // First caller fails at 100ms while the second is queued behind it;
        // the third arrives while the second is retrying.
        let first = spawn_refresh(&pipeline);
        let second = spawn_refresh(&pipeline);
        tokio::time::sleep(Duration::from_millis(150)).await;
        let third = spawn_refresh(&pipeline);

        for handle in [first, second, third] {
            assert_err!(handle.await.unwrap());
        }
        assert_eq!(snapshots.calls.load(Ordering::SeqCst), 3);
        assert_eq!(snapshots.peak.load(Ordering::SeqCst), 1);
    }
}
