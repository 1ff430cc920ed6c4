pub mod client;
pub mod source;

pub use client::{create_client, HttpRateSource};
pub use source::{RateSource, StaticRateSource};
