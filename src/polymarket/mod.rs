pub mod data_client;
pub mod gamma_client;
pub mod source;
pub mod types;

pub use data_client::DataClient;
pub use gamma_client::{GammaClient, GammaMarket};
pub use source::{MarketDataSource, PolymarketSource, SourceFetchError, TradeBatch};
pub use types::ApiTrade;
