// Remote projection data: request model, HTTP client, payload adapters and
// the on-disk fetch cache.

pub mod cache;
pub mod client;
pub mod payload;
pub mod request;

pub use cache::{CacheError, FetchCache, Fetcher};
pub use client::{FangraphsClient, FetchError, ProjectionProvider};
pub use request::{AuctionSettings, LeaderboardKind, PlayerType, Request};
