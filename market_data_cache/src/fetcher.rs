//! Cache-first data access with retry.
//!
//! [`RetryingFetcher`] glues a [`MarketDataProvider`] to a [`SeriesStore`]:
//! a fresh cache entry short-circuits the network entirely, a miss fetches
//! with exponential backoff and writes the result back. [`get_roster`] does
//! the same for the symbol universe, with a stale-cache fallback when the
//! roster source is down.

pub mod retry;

use chrono::{Days, NaiveDate};
use chrono_tz::Asia::Seoul;
use snafu::{Backtrace, ResultExt, Snafu};

use crate::{
    fetcher::retry::RetryPolicy,
    models::{roster::Roster, series::Series, window::FetchWindow},
    providers::{MarketDataProvider, ProviderError, RosterProvider},
    store::{StoreError, roster_store::RosterStore, series_store::SeriesStore},
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum FetchError {
    /// The data source failed, after retries where they applied.
    #[snafu(display("Provider request failed: {source}"))]
    Provider {
        #[snafu(backtrace)]
        source: ProviderError,
    },

    /// The cache layer failed.
    #[snafu(display("Cache store failed: {source}"))]
    Store {
        #[snafu(backtrace)]
        source: StoreError,
    },

    /// An offline-only request found nothing on disk.
    #[snafu(display("No cached data for {symbol} over {window}"))]
    CacheMiss {
        symbol: String,
        window: FetchWindow,
        backtrace: Backtrace,
    },

    /// The roster source produced no usable symbols.
    #[snafu(display("Roster source returned no symbols"))]
    EmptyRoster { backtrace: Backtrace },
}

/// Today's date on the exchange clock (Seoul).
///
/// The cache TTL runs on wall-clock age, but "is today's close out yet" and
/// incremental refresh bounds are questions about the trading calendar, and
/// the reference market for those is KRX.
pub fn trading_today() -> NaiveDate {
    chrono::Utc::now().with_timezone(&Seoul).date_naive()
}

/// Cache-first series access for one provider and one store.
pub struct RetryingFetcher<P> {
    provider: P,
    store: SeriesStore,
    policy: RetryPolicy,
}

impl<P: MarketDataProvider> RetryingFetcher<P> {
    pub fn new(provider: P, store: SeriesStore, policy: RetryPolicy) -> Self {
        Self {
            provider,
            store,
            policy,
        }
    }

    pub fn store(&self) -> &SeriesStore {
        &self.store
    }

    /// Cache-first load.
    ///
    /// A fresh cache entry is returned as-is. On a miss the provider is
    /// called (with retry on transient failures) and the result is written
    /// back, an empty one included: "no data for this window" is a valid
    /// answer that holds for a TTL, not a failure to probe again.
    pub async fn get_daily(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, FetchError> {
        if let Some(series) = self.store.load_fresh(symbol, window).await.context(StoreSnafu)? {
            tracing::debug!(symbol, window = %window, bars = series.len(), "cache hit");
            return Ok(series);
        }

        let series = self
            .fetch_with_retry(symbol, window)
            .await
            .context(ProviderSnafu)?;
        self.store.put(&series, window).await.context(StoreSnafu)?;
        Ok(series)
    }

    /// Cached-only load for offline runs. Any age is accepted; a miss is an
    /// error the caller turns into a per-symbol skip.
    pub async fn get_daily_offline(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, FetchError> {
        match self.store.load_any(symbol, window).await.context(StoreSnafu)? {
            Some(series) => Ok(series),
            None => CacheMissSnafu { symbol, window }.fail(),
        }
    }

    /// Bring a full-history cache entry up to `today`.
    ///
    /// With a usable entry on disk only the span past its last date is
    /// fetched and appended; without one this is a plain full fetch. The
    /// existing entry survives unchanged when the tail fetch comes back
    /// empty.
    pub async fn refresh_full(&self, symbol: &str, today: NaiveDate) -> Result<Series, FetchError> {
        let window = FetchWindow::FullHistory;
        let existing = self.store.load_any(symbol, window).await.context(StoreSnafu)?;

        let Some(mut base) = existing.filter(|s| !s.is_empty()) else {
            let series = self
                .fetch_with_retry(symbol, window)
                .await
                .context(ProviderSnafu)?;
            self.store.put(&series, window).await.context(StoreSnafu)?;
            return Ok(series);
        };

        let Some(last) = base.last_date() else {
            return Ok(base);
        };
        if last >= today {
            tracing::debug!(symbol, %last, "cache already current");
            return Ok(base);
        }
        let Some(start) = last.checked_add_days(Days::new(1)) else {
            return Ok(base);
        };
        let Ok(tail_window) = FetchWindow::dated(start, today) else {
            return Ok(base);
        };

        let tail = self
            .fetch_with_retry(symbol, tail_window)
            .await
            .context(ProviderSnafu)?;
        if tail.is_empty() {
            tracing::debug!(symbol, window = %tail_window, "no new bars");
            return Ok(base);
        }

        let appended = tail.len();
        base.merge_tail(&tail);
        self.store.put(&base, window).await.context(StoreSnafu)?;
        tracing::debug!(symbol, appended, total = base.len(), "appended new bars");
        Ok(base)
    }

    /// Whether the source already has a close for `today`, probed on one
    /// liquid symbol. Bulk refreshes run this first so a pre-close run does
    /// not stamp every cache entry with yesterday's data as today's.
    pub async fn has_todays_close(
        &self,
        probe_symbol: &str,
        today: NaiveDate,
    ) -> Result<bool, FetchError> {
        let window = FetchWindow::Dated {
            start: today,
            end: today,
        };
        let series = self
            .fetch_with_retry(probe_symbol, window)
            .await
            .context(ProviderSnafu)?;
        Ok(!series.is_empty())
    }

    async fn fetch_with_retry(
        &self,
        symbol: &str,
        window: FetchWindow,
    ) -> Result<Series, ProviderError> {
        let mut attempt = 1;
        loop {
            match self.provider.fetch_daily(symbol, window).await {
                Ok(series) => return Ok(series),
                Err(err) if err.is_transient() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    tracing::warn!(
                        symbol,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient fetch failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Cache-first roster access.
///
/// A fresh cached roster short-circuits the source. On a miss the source is
/// fetched and cached; if the source fails but a cached roster of any age
/// exists, the stale copy is used with a warning. A roster with zero symbols
/// is an error either way.
pub async fn get_roster<R: RosterProvider>(
    provider: &R,
    store: &RosterStore,
) -> Result<Roster, FetchError> {
    if let Some(roster) = store.load_fresh().await.context(StoreSnafu)? {
        if !roster.is_empty() {
            tracing::debug!(symbols = roster.len(), "roster cache hit");
            return Ok(roster);
        }
    }

    match provider.fetch_roster().await {
        Ok(entries) => {
            let roster = Roster::from_entries(entries);
            if roster.is_empty() {
                return EmptyRosterSnafu.fail();
            }
            store.put(&roster).await.context(StoreSnafu)?;
            Ok(roster)
        }
        Err(err) => {
            if let Some(stale) = store.load_any().await.context(StoreSnafu)? {
                if !stale.is_empty() {
                    tracing::warn!(
                        error = %err,
                        symbols = stale.len(),
                        "roster source failed, falling back to stale cache"
                    );
                    return Ok(stale);
                }
            }
            Err(err).context(ProviderSnafu)
        }
    }
}
