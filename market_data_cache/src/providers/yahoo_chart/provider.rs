use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use shared_utils::env::env_var_or;
use snafu::{ResultExt, ensure};
use url::Url;

use crate::{
    models::{series::Series, window::FetchWindow},
    providers::{
        ApiSnafu, ClientBuildSnafu, DecodeSnafu, InvalidBaseUrlSnafu, MarketDataProvider,
        ProviderError, ProviderInitError, ReqwestSnafu, StatusSnafu, ValidationSnafu,
        yahoo_chart::{
            params::construct_params,
            response::{ChartResponse, is_delisted_error},
        },
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart/";

/// Overrides the chart endpoint, e.g. to point tests at a local server.
const BASE_URL_VAR: &str = "YAHOO_CHART_BASE_URL";

/// The chart endpoint rejects clientless requests, so present a browser.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Daily bar source backed by the public v8 chart endpoint.
pub struct YahooChartProvider {
    client: Client,
    base_url: Url,
}

impl YahooChartProvider {
    /// Creates a provider against the default query host.
    pub fn new() -> Result<Self, ProviderInitError> {
        Self::with_base_url(BASE_URL)
    }

    /// Creates a provider honoring the `YAHOO_CHART_BASE_URL` override.
    pub fn from_env() -> Result<Self, ProviderInitError> {
        Self::with_base_url(&env_var_or(BASE_URL_VAR, BASE_URL))
    }

    /// Creates a provider against a custom chart endpoint.
    ///
    /// Useful for the alternate query hosts Yahoo runs (query2) and for
    /// pointing at a local stand-in server.
    pub fn with_base_url(base: &str) -> Result<Self, ProviderInitError> {
        let base_url = Url::parse(base).context(InvalidBaseUrlSnafu)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::USER_AGENT, header::HeaderValue::from_static(USER_AGENT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self { client, base_url })
    }

    fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                ValidationSnafu {
                    message: format!("base URL {} cannot take a symbol segment", self.base_url),
                }
                .build()
            })?;
            segments.pop_if_empty().push(symbol);
        }
        Ok(url)
    }
}

#[async_trait]
impl MarketDataProvider for YahooChartProvider {
    async fn fetch_daily(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, ProviderError> {
        let symbol = symbol.trim();
        ensure!(
            !symbol.is_empty(),
            ValidationSnafu {
                message: "symbol must not be empty".to_string(),
            }
        );

        let url = self.chart_url(symbol)?;
        let query_params = construct_params(window);

        tracing::debug!(symbol, window = %window, "requesting daily bars");

        let response = self
            .client
            .get(url)
            .query(&query_params)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        // Dead symbols come back as an error payload, often under a 404, and
        // are data ("nothing trades here"), not a failure.
        if !status.is_success() {
            if let Ok(parsed) = serde_json::from_str::<ChartResponse>(&body) {
                if let Some(message) = parsed.error_description() {
                    if is_delisted_error(&message) {
                        tracing::debug!(symbol, message, "symbol reported dead, empty series");
                        return Ok(Series::empty(symbol));
                    }
                    return ApiSnafu { message }.fail();
                }
            }
            return StatusSnafu { status }.fail();
        }

        let parsed = serde_json::from_str::<ChartResponse>(&body).context(DecodeSnafu)?;
        if let Some(message) = parsed.error_description() {
            if is_delisted_error(&message) {
                tracing::debug!(symbol, message, "symbol reported dead, empty series");
                return Ok(Series::empty(symbol));
            }
            return ApiSnafu { message }.fail();
        }

        let bars = parsed.into_daily_bars();
        tracing::debug!(symbol, bars = bars.len(), "fetched daily bars");

        Ok(Series::from_bars(symbol, bars))
    }
}
