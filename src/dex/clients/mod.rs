// src/dex/clients/mod.rs
//! Venue adapter implementations. Each implements `VenueAdapter`.

pub mod balancer;
pub mod binance;
pub mod coinbase;
pub mod sushiswap;
pub mod uniswap;

pub use balancer::BalancerAdapter;
pub use binance::BinanceAdapter;
pub use coinbase::CoinbaseAdapter;
pub use sushiswap::SushiSwapAdapter;
pub use uniswap::SubgraphPoolAdapter;
