//! Data providers: traits, HTTP adapters and the shared client setup

pub mod http;
pub mod mood;
pub mod news;
pub mod nse;
pub mod provider;
pub mod yahoo;

pub use mood::VixMoodProvider;
pub use news::NewsApiProvider;
pub use nse::NseFlowProvider;
pub use provider::{
    FetchWindow, FlowProvider, MoodProvider, NewsProvider, ProviderError, QuoteProvider,
};
pub use yahoo::YahooProvider;
