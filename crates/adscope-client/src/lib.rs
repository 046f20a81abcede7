//! `reqwest`-backed [`AdsDataSource`](adscope_engine::AdsDataSource) for the
//! ads reporting API.

pub mod client;
pub mod error;
mod wire;

pub use client::AdsApiClient;
pub use error::ClientError;
