pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod rates;
pub mod service;

pub use api::{router, AppState};
pub use crate::config::AppConfig;
pub use error::{AppError, Result};
pub use rates::{create_client, HttpRateSource, RateSource, StaticRateSource};
pub use service::{ColorExtractor, CurrencyService, DocumentAssembler};
