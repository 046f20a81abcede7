//! Shared domain types and configuration for adscope.

pub mod app_config;
pub mod config;
pub mod types;

pub use app_config::{AppConfig, EngineSettings, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use types::{
    AdGroupNegatives, CampaignNegatives, Keyword, KeywordMetrics, MatchType, NegativeKeyword,
    NegativeLevel, Page, SharedListRef,
};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
