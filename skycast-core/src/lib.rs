//! Core library for the skycast weather dashboard.
//!
//! This crate defines:
//! - Configuration & credentials handling (API keys per provider)
//! - Adapters over the upstream weather providers and their normalizers
//! - The canonical response models shared by every provider
//! - The fallback orchestrator that tries providers in preference order
//!
//! It is used by `skycast-cli`, but can also be reused by other binaries or
//! services (e.g. an HTTP route layer).

pub mod condition;
pub mod config;
pub mod error;
pub mod model;
pub mod provider;
pub mod service;
pub mod units;

pub use condition::ConditionKind;
pub use config::{Config, ProviderConfig};
pub use error::{ProviderError, ProviderFailure, WeatherError};
pub use model::{
    AirQualityReading, AstronomyReading, Condition, Coordinates, ForecastEntry, ForecastSeries,
    GeocodeMatch, HistoricalReading, MarineReading, WeatherSnapshot,
};
pub use provider::{Capability, ProviderId, ProviderRegistry, WeatherProvider};
pub use service::{MAX_HISTORY_DAYS, WeatherService, trial_order};
pub use units::Units;
