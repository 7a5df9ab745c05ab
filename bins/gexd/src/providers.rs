//! Upstream provider construction from configuration

use anyhow::{bail, Context, Result};
use config::{ProviderKind, StaticMarketConfig, StaticOptionConfig, UpstreamConfig};
use market_data::{DeribitClient, Instrument, OptionType, SnapshotProvider, StaticMarketData, Ticker, TickerProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct Providers {
    pub snapshots: Arc<dyn SnapshotProvider>,
    pub tickers: Arc<dyn TickerProvider>,
}

pub fn build_providers(upstream: &UpstreamConfig) -> Result<Providers> {
    match upstream.provider {
        ProviderKind::Deribit => {
            let client = DeribitClient::new(
                upstream.base_url.clone(),
                Duration::from_millis(upstream.request_timeout_ms),
            )
            .context("Failed to build Deribit client")?;
            info!(base_url = client.base_url(), "Using Deribit provider");

            let client = Arc::new(client);
            Ok(Providers {
                snapshots: client.clone(),
                tickers: client,
            })
        }
        ProviderKind::Static => {
            let market_config = upstream
                .static_market
                .as_ref()
                .context("upstream.static_market is required for the static provider")?;
            let market = Arc::new(static_market(market_config)?);
            info!("Using static market provider");

            Ok(Providers {
                snapshots: market.clone(),
                tickers: market,
            })
        }
    }
}

fn option_type(option: &StaticOptionConfig) -> Result<OptionType> {
    match option.option_type.trim().to_lowercase().as_str() {
        "call" | "c" => Ok(OptionType::Call),
        "put" | "p" => Ok(OptionType::Put),
        other => bail!(
            "static option '{}' has unknown option_type '{}'",
            option.instrument_name,
            other
        ),
    }
}

pub fn static_market(config: &StaticMarketConfig) -> Result<StaticMarketData> {
    let market = StaticMarketData::new();

    for (asset, price) in &config.spot_prices {
        market.set_spot_price(asset, *price);
    }

    for (asset, options) in &config.options {
        let mut instruments = Vec::with_capacity(options.len());
        for option in options {
            let instrument = Instrument::new(
                option.instrument_name.clone(),
                option.strike,
                option_type(option)?,
                option.expiration_timestamp,
            )
            .with_contract_size(option.contract_size);

            market.set_ticker(
                &option.instrument_name,
                Ticker {
                    open_interest: option.open_interest,
                    volume: option.volume,
                    mark_iv: option.mark_iv,
                    gamma: option.gamma,
                },
            );
            instruments.push(instrument);
        }
        market.set_instruments(asset, instruments);
    }

    Ok(market)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn option(name: &str, option_type: &str) -> StaticOptionConfig {
        StaticOptionConfig {
            instrument_name: name.to_string(),
            strike: 60000.0,
            option_type: option_type.to_string(),
            expiration_timestamp: 1_719_561_600_000,
            contract_size: 1.0,
            open_interest: 12.0,
            volume: 3.0,
            mark_iv: Some(55.0),
            gamma: None,
        }
    }

    fn market_config(options: Vec<StaticOptionConfig>) -> StaticMarketConfig {
        StaticMarketConfig {
            spot_prices: HashMap::from([("BTC".to_string(), 61000.0)]),
            options: HashMap::from([("BTC".to_string(), options)]),
        }
    }

    #[tokio::test]
    async fn test_static_market_from_config() {
        let market = static_market(&market_config(vec![
            option("BTC-28JUN24-60000-C", "call"),
            option("BTC-28JUN24-60000-P", "P"),
        ]))
        .unwrap();

        assert_eq!(market.spot_price("btc").await.unwrap(), 61000.0);
        let instruments = market.instruments("BTC").await.unwrap();
        assert_eq!(instruments.len(), 2);
        assert_eq!(instruments[1].option_type, OptionType::Put);

        let ticker = market.ticker("BTC-28JUN24-60000-C").await.unwrap().unwrap();
        assert_eq!(ticker.open_interest, 12.0);
        assert_eq!(ticker.mark_iv, Some(55.0));
    }

    #[test]
    fn test_unknown_option_type() {
        let err = static_market(&market_config(vec![option("X", "straddle")])).unwrap_err();
        assert!(err.to_string().contains("straddle"));
    }

    #[test]
    fn test_static_provider_requires_market() {
        let upstream = UpstreamConfig {
            provider: ProviderKind::Static,
            static_market: None,
            ..UpstreamConfig::default()
        };
        assert!(build_providers(&upstream).is_err());
    }
}
