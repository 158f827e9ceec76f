//! Fallback orchestrator.
//!
//! Each request computes a deterministic provider trial order, walks it
//! sequentially, and returns the first normalized success. Providers missing
//! from the registry (no API key) or failing upstream are recorded and
//! skipped; exhausting the order yields [`WeatherError::AllProvidersFailed`]
//! with one failure entry per attempted provider. Results are whole-success
//! or whole-failure, never partial. The service holds no per-request state,
//! so independent requests can run concurrently on shared references.

use std::{future::Future, pin::Pin};

use chrono::{NaiveDate, Utc};
use tracing::{debug, warn};

use crate::{
    error::{ProviderError, ProviderFailure, WeatherError},
    model::{
        AirQualityReading, AstronomyReading, Coordinates, ForecastSeries, GeocodeMatch,
        HistoricalReading, MarineReading, WeatherSnapshot,
    },
    provider::{Capability, ProviderId, ProviderRegistry, WeatherProvider},
    units::Units,
};

/// Oldest date the historical endpoints will serve, in days before today.
pub const MAX_HISTORY_DAYS: u32 = 7;

type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ProviderError>> + Send + 'a>>;

/// Providers to try for a capability: the preferred provider first (when it
/// supports the capability), then the remaining supporting providers in the
/// fixed default order. Pure and reproducible.
pub fn trial_order(capability: Capability, preferred: Option<ProviderId>) -> Vec<ProviderId> {
    let mut order: Vec<ProviderId> = ProviderId::all()
        .iter()
        .copied()
        .filter(|p| p.supports(capability))
        .collect();

    if let Some(preferred) = preferred
        && let Some(pos) = order.iter().position(|p| *p == preferred)
        && pos > 0
    {
        order.remove(pos);
        order.insert(0, preferred);
    }

    order
}

fn check_history_date(date: NaiveDate, today: NaiveDate) -> Result<(), WeatherError> {
    let oldest = today - chrono::Duration::days(i64::from(MAX_HISTORY_DAYS));
    if date > today || date < oldest {
        return Err(WeatherError::DateOutOfRange {
            date,
            max_days: MAX_HISTORY_DAYS,
        });
    }
    Ok(())
}

/// Entry point consumed by the route layer. Construct one per process with
/// a registry built from config and a shared HTTP client.
#[derive(Debug)]
pub struct WeatherService {
    registry: ProviderRegistry,
}

impl WeatherService {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self { registry }
    }

    /// Current weather with provider fallback.
    pub async fn get_weather_data(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        preferred: Option<ProviderId>,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let coords = Coordinates { lat, lon };
        self.try_providers(Capability::Current, preferred, move |p| {
            p.current(coords, units)
        })
        .await
    }

    /// Forecast series with provider fallback.
    pub async fn get_forecast_data(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        preferred: Option<ProviderId>,
    ) -> Result<ForecastSeries, WeatherError> {
        let coords = Coordinates { lat, lon };
        self.try_providers(Capability::Forecast, preferred, move |p| {
            p.forecast(coords, units)
        })
        .await
    }

    /// Marine conditions with provider fallback (WeatherAPI, Open-Meteo).
    pub async fn get_marine_weather_data(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
        preferred: Option<ProviderId>,
    ) -> Result<MarineReading, WeatherError> {
        let coords = Coordinates { lat, lon };
        self.try_providers(Capability::Marine, preferred, move |p| p.marine(coords, units))
            .await
    }

    /// Past-day weather with provider fallback. Dates in the future or
    /// older than [`MAX_HISTORY_DAYS`] are rejected before any call.
    pub async fn get_historical_weather_data(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
        units: Units,
        preferred: Option<ProviderId>,
    ) -> Result<HistoricalReading, WeatherError> {
        check_history_date(date, Utc::now().date_naive())?;

        let coords = Coordinates { lat, lon };
        self.try_providers(Capability::Historical, preferred, move |p| {
            p.historical(coords, date, units)
        })
        .await
    }

    /// Air quality, OpenWeatherMap only; no fallback list to exhaust.
    pub async fn get_air_pollution_data(
        &self,
        lat: f64,
        lon: f64,
    ) -> Result<AirQualityReading, WeatherError> {
        let provider = self.single_provider(ProviderId::OpenWeather)?;
        Ok(provider.air_quality(Coordinates { lat, lon }).await?)
    }

    /// Sun/moon data, WeatherAPI only; no fallback list to exhaust.
    pub async fn get_astronomy_data(
        &self,
        lat: f64,
        lon: f64,
        date: NaiveDate,
    ) -> Result<AstronomyReading, WeatherError> {
        let provider = self.single_provider(ProviderId::WeatherApi)?;
        Ok(provider.astronomy(Coordinates { lat, lon }, date).await?)
    }

    /// Free-text location search, OpenWeatherMap geocoding only.
    pub async fn get_city_coordinates(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<GeocodeMatch>, WeatherError> {
        let provider = self.single_provider(ProviderId::OpenWeather)?;
        Ok(provider.geocode(query, country).await?)
    }

    fn single_provider(&self, id: ProviderId) -> Result<&dyn WeatherProvider, WeatherError> {
        self.registry
            .get(id)
            .ok_or_else(|| WeatherError::Provider(ProviderError::NotConfigured { provider: id }))
    }

    async fn try_providers<T, F>(
        &self,
        capability: Capability,
        preferred: Option<ProviderId>,
        mut call: F,
    ) -> Result<T, WeatherError>
    where
        F: for<'a> FnMut(&'a dyn WeatherProvider) -> ProviderFuture<'a, T>,
    {
        let order = trial_order(capability, preferred);
        let mut failures = Vec::new();

        for id in order {
            let Some(provider) = self.registry.get(id) else {
                debug!(provider = %id, %capability, "provider not configured, skipping");
                failures.push(ProviderFailure {
                    provider: id,
                    error: ProviderError::NotConfigured { provider: id },
                });
                continue;
            };

            debug!(provider = %id, %capability, "querying provider");
            match call(provider).await {
                Ok(value) => return Ok(value),
                Err(error) => {
                    match &error {
                        // schema drift, not a transient outage
                        ProviderError::Normalization { .. } => {
                            warn!(provider = %id, %capability, %error,
                                "provider payload did not match expected schema")
                        }
                        _ => warn!(provider = %id, %capability, %error, "provider attempt failed"),
                    }
                    failures.push(ProviderFailure {
                        provider: id,
                        error,
                    });
                }
            }
        }

        Err(WeatherError::AllProvidersFailed {
            capability,
            failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_fixed() {
        assert_eq!(
            trial_order(Capability::Current, None),
            vec![
                ProviderId::OpenWeather,
                ProviderId::OpenMeteo,
                ProviderId::WeatherApi
            ]
        );
    }

    #[test]
    fn preferred_provider_moves_to_front() {
        assert_eq!(
            trial_order(Capability::Current, Some(ProviderId::WeatherApi)),
            vec![
                ProviderId::WeatherApi,
                ProviderId::OpenWeather,
                ProviderId::OpenMeteo
            ]
        );
    }

    #[test]
    fn order_excludes_non_supporting_providers() {
        let order = trial_order(Capability::Marine, None);
        assert_eq!(order, vec![ProviderId::OpenMeteo, ProviderId::WeatherApi]);

        let order = trial_order(Capability::Astronomy, None);
        assert_eq!(order, vec![ProviderId::WeatherApi]);
    }

    #[test]
    fn preferred_without_capability_is_dropped_not_promoted() {
        // OpenWeatherMap has no marine endpoint; preferring it must not
        // smuggle it into the order
        let order = trial_order(Capability::Marine, Some(ProviderId::OpenWeather));
        assert_eq!(order, vec![ProviderId::OpenMeteo, ProviderId::WeatherApi]);
    }

    #[test]
    fn order_is_reproducible() {
        let a = trial_order(Capability::Forecast, Some(ProviderId::OpenMeteo));
        let b = trial_order(Capability::Forecast, Some(ProviderId::OpenMeteo));
        assert_eq!(a, b);
    }

    #[test]
    fn history_dates_within_last_week_pass() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        assert!(check_history_date(today, today).is_ok());
        let six_days_ago = today - chrono::Duration::days(6);
        assert!(check_history_date(six_days_ago, today).is_ok());
        let oldest = today - chrono::Duration::days(7);
        assert!(check_history_date(oldest, today).is_ok());
    }

    #[test]
    fn future_and_stale_history_dates_are_rejected() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();

        let tomorrow = today + chrono::Duration::days(1);
        assert!(matches!(
            check_history_date(tomorrow, today),
            Err(WeatherError::DateOutOfRange { .. })
        ));

        let eight_days_ago = today - chrono::Duration::days(8);
        assert!(matches!(
            check_history_date(eight_days_ago, today),
            Err(WeatherError::DateOutOfRange { .. })
        ));
    }
}
