//! Provider abstraction: one adapter per upstream weather source.
//!
//! Each adapter implements the subset of [`WeatherProvider`] its upstream
//! API actually serves; the default method bodies return
//! [`ProviderError::Unsupported`] so the orchestrator can treat a missing
//! capability like any other skip. Capability declarations are static on
//! [`ProviderId`] and fixed for the life of the process.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, convert::TryFrom, fmt::Debug};

use crate::{
    Config,
    error::ProviderError,
    model::{
        AirQualityReading, AstronomyReading, Coordinates, ForecastSeries, GeocodeMatch,
        HistoricalReading, MarineReading, WeatherSnapshot,
    },
    units::Units,
};

pub mod openmeteo;
pub mod openweather;
pub mod weatherapi;

/// Upstream sources, in the default fallback order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenWeather,
    OpenMeteo,
    WeatherApi,
}

/// Kinds of weather data a provider may or may not serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Current,
    Forecast,
    Marine,
    Historical,
    AirQuality,
    Astronomy,
    Geocode,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Current => "current weather",
            Capability::Forecast => "forecast",
            Capability::Marine => "marine weather",
            Capability::Historical => "historical weather",
            Capability::AirQuality => "air quality",
            Capability::Astronomy => "astronomy",
            Capability::Geocode => "geocoding",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::OpenMeteo => "openmeteo",
            ProviderId::WeatherApi => "weatherapi",
        }
    }

    /// Name used in normalized results, e.g. `provider: "OpenWeatherMap"`.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "OpenWeatherMap",
            ProviderId::OpenMeteo => "Open-Meteo",
            ProviderId::WeatherApi => "WeatherAPI",
        }
    }

    /// All providers in the default fallback order.
    pub const fn all() -> &'static [ProviderId] {
        &[
            ProviderId::OpenWeather,
            ProviderId::OpenMeteo,
            ProviderId::WeatherApi,
        ]
    }

    pub const fn requires_api_key(&self) -> bool {
        match self {
            ProviderId::OpenWeather | ProviderId::WeatherApi => true,
            ProviderId::OpenMeteo => false,
        }
    }

    pub const fn capabilities(&self) -> &'static [Capability] {
        match self {
            ProviderId::OpenWeather => &[
                Capability::Current,
                Capability::Forecast,
                Capability::AirQuality,
                Capability::Geocode,
            ],
            ProviderId::OpenMeteo => &[
                Capability::Current,
                Capability::Forecast,
                Capability::Marine,
                Capability::Historical,
            ],
            ProviderId::WeatherApi => &[
                Capability::Current,
                Capability::Forecast,
                Capability::Marine,
                Capability::Historical,
                Capability::Astronomy,
            ],
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" | "openweathermap" => Ok(ProviderId::OpenWeather),
            "openmeteo" | "open-meteo" => Ok(ProviderId::OpenMeteo),
            "weatherapi" => Ok(ProviderId::WeatherApi),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, openmeteo, weatherapi."
            )),
        }
    }
}

/// A provider adapter: performs the upstream HTTP call and hands the typed
/// raw payload to its normalizer. No retries happen here; trying another
/// provider is the orchestrator's job.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    async fn current(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let _ = (coords, units);
        Err(self.unsupported(Capability::Current))
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSeries, ProviderError> {
        let _ = (coords, units);
        Err(self.unsupported(Capability::Forecast))
    }

    async fn marine(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<MarineReading, ProviderError> {
        let _ = (coords, units);
        Err(self.unsupported(Capability::Marine))
    }

    async fn historical(
        &self,
        coords: Coordinates,
        date: NaiveDate,
        units: Units,
    ) -> Result<HistoricalReading, ProviderError> {
        let _ = (coords, date, units);
        Err(self.unsupported(Capability::Historical))
    }

    async fn air_quality(&self, coords: Coordinates) -> Result<AirQualityReading, ProviderError> {
        let _ = coords;
        Err(self.unsupported(Capability::AirQuality))
    }

    async fn astronomy(
        &self,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<AstronomyReading, ProviderError> {
        let _ = (coords, date);
        Err(self.unsupported(Capability::Astronomy))
    }

    async fn geocode(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<GeocodeMatch>, ProviderError> {
        let _ = (query, country);
        Err(self.unsupported(Capability::Geocode))
    }
}

trait UnsupportedExt {
    fn unsupported(&self, capability: Capability) -> ProviderError;
}

impl<T: WeatherProvider + ?Sized> UnsupportedExt for T {
    fn unsupported(&self, capability: Capability) -> ProviderError {
        ProviderError::Unsupported {
            provider: self.id(),
            capability,
        }
    }
}

/// Adapters for every configured provider, built once at startup with a
/// shared HTTP client. Unconfigured providers are simply absent, which the
/// orchestrator reads as a skip.
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Box<dyn WeatherProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &Config, http: Client) -> Self {
        let mut registry = Self::new();

        if let Some(key) = config.provider_api_key(ProviderId::OpenWeather) {
            registry.insert(Box::new(openweather::OpenWeatherProvider::new(
                key.to_owned(),
                http.clone(),
            )));
        }
        registry.insert(Box::new(openmeteo::OpenMeteoProvider::new(http.clone())));
        if let Some(key) = config.provider_api_key(ProviderId::WeatherApi) {
            registry.insert(Box::new(weatherapi::WeatherApiProvider::new(
                key.to_owned(),
                http,
            )));
        }

        registry
    }

    pub fn insert(&mut self, provider: Box<dyn WeatherProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: ProviderId) -> Option<&dyn WeatherProvider> {
        self.providers.get(&id).map(Box::as_ref)
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }
}

pub(crate) fn unix_to_utc(ts: i64) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::from_timestamp(ts, 0)
}

/// Keep upstream error bodies readable in logs and error messages.
/// Bodies are arbitrary text, so the cut must land on a char boundary.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
