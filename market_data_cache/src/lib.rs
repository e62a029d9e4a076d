pub mod fetcher;
pub mod models;
pub mod providers;
pub mod store;

pub use fetcher::{FetchError, RetryingFetcher, get_roster, retry::RetryPolicy, trading_today};
pub use models::{
    bar::DailyBar,
    roster::{Roster, RosterEntry},
    series::Series,
    window::{FetchWindow, WindowError},
};
pub use providers::{MarketDataProvider, ProviderError, RosterProvider};
pub use store::{StoreError, roster_store::RosterStore, series_store::SeriesStore};
