//! Market Brief Core: domain types, configuration and data providers.
//!
//! This crate holds everything the pipeline stages share:
//! - Domain types (snapshot sections, quotes, processed dataset, mood scale)
//! - The tickers/sources configuration and API secrets
//! - Provider traits plus the Yahoo Finance, NewsAPI and NSE adapters

pub mod config;
pub mod data;
pub mod domain;

pub use config::{ConfigError, Instrument, PipelineConfig, Secrets};
pub use domain::{ProcessedDataset, Section, Snapshot};
