//! Bounded parallel ticker fan-out
//!
//! Each task fetches one ticker and runs the Greeks model on it. Tasks share
//! nothing mutable; their outcomes are collected and partitioned afterwards.

use crate::greeks::{GreeksModel, SkipReason};
use crate::types::GreeksSample;
use futures::stream::{self, StreamExt};
use market_data::{Instrument, TickerProvider};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_CONCURRENCY: usize = 16;
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy)]
pub struct SampleOptions {
    pub concurrency: usize,
    pub fetch_timeout: Duration,
}

impl Default for SampleOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// An instrument left out of the cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub instrument_name: String,
    pub reason: SkipReason,
}

/// Outcome of one fan-out. Order is not meaningful.
#[derive(Debug, Clone, Default)]
pub struct SampleBatch {
    pub samples: Vec<GreeksSample>,
    pub skipped: Vec<Skipped>,
}

impl SampleBatch {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

async fn sample_one(
    instrument: Instrument,
    tickers: &dyn TickerProvider,
    model: &dyn GreeksModel,
    spot: f64,
    now_ms: i64,
    fetch_timeout: Duration,
) -> Result<GreeksSample, Skipped> {
    let skip = |reason: SkipReason| Skipped {
        instrument_name: instrument.instrument_name.clone(),
        reason,
    };

    let ticker = match tokio::time::timeout(fetch_timeout, tickers.ticker(&instrument.instrument_name)).await {
        Err(_) => return Err(skip(SkipReason::Timeout)),
        Ok(Err(e)) => {
            debug!(instrument = %instrument.instrument_name, error = %e, "ticker fetch failed");
            return Err(skip(SkipReason::FetchFailed));
        }
        Ok(Ok(None)) => return Err(skip(SkipReason::NoTicker)),
        Ok(Ok(Some(ticker))) => ticker,
    };

    model
        .sample(&instrument, &ticker, spot, now_ms)
        .map_err(skip)
}

/// Fetch tickers for `instruments` with at most `options.concurrency` in
/// flight and turn each into a sample or a skip.
///
/// A slow or failing instrument never aborts the batch.
pub async fn collect_samples(
    instruments: Vec<Instrument>,
    tickers: &dyn TickerProvider,
    model: &dyn GreeksModel,
    spot: f64,
    now_ms: i64,
    options: SampleOptions,
) -> SampleBatch {
    let concurrency = options.concurrency.max(1);

    let outcomes: Vec<Result<GreeksSample, Skipped>> = stream::iter(instruments)
        .map(|instrument| sample_one(instrument, tickers, model, spot, now_ms, options.fetch_timeout))
        .buffer_unordered(concurrency)
        .collect()
        .await;

    let mut batch = SampleBatch::default();
    for outcome in outcomes {
        match outcome {
            Ok(sample) => batch.samples.push(sample),
            Err(skipped) => {
                debug!(instrument = %skipped.instrument_name, reason = %skipped.reason, "instrument skipped");
                batch.skipped.push(skipped);
            }
        }
    }

    batch
}
