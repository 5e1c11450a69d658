pub mod api;
pub mod upstream;

pub use api::{ApiError, ApiServer, ApiServerConfig, AppState};
pub use upstream::{
    BalanceSource, CoinGeckoClient, ImageSource, PriceSource, ProcessedToken, RawToken,
    ThirdwebClient, UpstreamError, WalletPage,
};
