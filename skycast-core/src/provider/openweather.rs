//! OpenWeatherMap adapter and normalizers.
//!
//! Serves current weather, 3-hourly/5-day forecast, air pollution, and
//! direct geocoding. The `units` query parameter makes the API return the
//! requested unit system natively (Celsius + m/s for metric, Fahrenheit +
//! mph for imperial), so the normalizers here do no unit math.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::{
    condition::ConditionKind,
    error::ProviderError,
    model::{
        AirQualityReading, Condition, Coordinates, ForecastEntry, ForecastSeries, GeocodeMatch,
        PollutantConcentrations, Temperature, UNKNOWN_LOCATION, WeatherSnapshot, Wind, aqi_label,
    },
    provider::{ProviderId, WeatherProvider, truncate_body, unix_to_utc},
    units::Units,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

const GEOCODE_LIMIT: u8 = 5;

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    http: Client,
    base_url: String,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the adapter at a different host. Test seam for mocked upstreams.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.base_url);

        let res = self.http.get(&url).query(query).send().await.map_err(|e| {
            ProviderError::RequestFailed {
                provider: ProviderId::OpenWeather,
                status: None,
                message: e.to_string(),
            }
        })?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| ProviderError::RequestFailed {
                provider: ProviderId::OpenWeather,
                status: Some(status.as_u16()),
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            return Err(ProviderError::RequestFailed {
                provider: ProviderId::OpenWeather,
                status: Some(status.as_u16()),
                message: truncate_body(&body),
            });
        }

        serde_json::from_str(&body).map_err(|e| ProviderError::Normalization {
            provider: ProviderId::OpenWeather,
            reason: format!("{path}: {e}"),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    async fn current(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<WeatherSnapshot, ProviderError> {
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let raw: OwCurrentResponse = self
            .get_json(
                "/data/2.5/weather",
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("units", units.as_str()),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        Ok(normalize_current(&raw))
    }

    async fn forecast(
        &self,
        coords: Coordinates,
        units: Units,
    ) -> Result<ForecastSeries, ProviderError> {
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let raw: OwForecastResponse = self
            .get_json(
                "/data/2.5/forecast",
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("units", units.as_str()),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        Ok(normalize_forecast(&raw, coords))
    }

    async fn air_quality(&self, coords: Coordinates) -> Result<AirQualityReading, ProviderError> {
        let lat = coords.lat.to_string();
        let lon = coords.lon.to_string();
        let raw: OwAirPollutionResponse = self
            .get_json(
                "/data/2.5/air_pollution",
                &[
                    ("lat", lat.as_str()),
                    ("lon", lon.as_str()),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        normalize_air_pollution(&raw)
    }

    async fn geocode(
        &self,
        query: &str,
        country: Option<&str>,
    ) -> Result<Vec<GeocodeMatch>, ProviderError> {
        // Country filter rides along in the query string, e.g. "Paris,FR".
        let q = match country {
            Some(c) => format!("{query},{c}"),
            None => query.to_string(),
        };
        let limit = GEOCODE_LIMIT.to_string();
        let raw: Vec<OwGeocodeEntry> = self
            .get_json(
                "/geo/1.0/direct",
                &[
                    ("q", q.as_str()),
                    ("limit", limit.as_str()),
                    ("appid", self.api_key.as_str()),
                ],
            )
            .await?;

        Ok(raw.iter().map(normalize_geocode_entry).collect())
    }
}

// ---- raw payloads -------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct OwCoord {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwWeather {
    pub id: i64,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct OwMain {
    pub temp: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: f64,
    pub humidity: u8,
}

#[derive(Debug, Deserialize)]
pub struct OwWind {
    pub speed: f64,
    #[serde(default)]
    pub deg: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwSys {
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwCurrentResponse {
    pub coord: OwCoord,
    pub weather: Vec<OwWeather>,
    pub main: OwMain,
    pub visibility: Option<f64>,
    pub wind: OwWind,
    pub dt: i64,
    pub sys: Option<OwSys>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwForecastEntry {
    pub dt: i64,
    pub main: OwMain,
    pub weather: Vec<OwWeather>,
    pub wind: OwWind,
    pub visibility: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OwCity {
    pub name: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OwForecastResponse {
    pub city: Option<OwCity>,
    pub list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OwAirMain {
    pub aqi: u8,
}

#[derive(Debug, Deserialize)]
pub struct OwAirComponents {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

#[derive(Debug, Deserialize)]
pub struct OwAirEntry {
    pub main: OwAirMain,
    pub components: OwAirComponents,
    pub dt: i64,
}

#[derive(Debug, Deserialize)]
pub struct OwAirPollutionResponse {
    pub list: Vec<OwAirEntry>,
}

#[derive(Debug, Deserialize)]
pub struct OwGeocodeEntry {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}

// ---- normalizers --------------------------------------------------------

fn condition_of(weather: &[OwWeather]) -> Condition {
    match weather.first() {
        Some(w) => Condition::new(
            w.id,
            ConditionKind::from_openweather_id(w.id),
            w.description.clone(),
        ),
        None => Condition::new(-1, ConditionKind::Unknown, "unknown"),
    }
}

/// The API already answered in the requested unit system, so this is a pure
/// field mapping with defaults for whatever the payload left out.
pub fn normalize_current(raw: &OwCurrentResponse) -> WeatherSnapshot {
    WeatherSnapshot {
        coordinates: Coordinates {
            lat: raw.coord.lat,
            lon: raw.coord.lon,
        },
        condition: condition_of(&raw.weather),
        temperature: Temperature {
            current: raw.main.temp,
            feels_like: raw.main.feels_like,
            min: raw.main.temp_min,
            max: raw.main.temp_max,
        },
        humidity_percent: raw.main.humidity,
        pressure_hpa: raw.main.pressure,
        // OpenWeatherMap caps visibility at 10 km and may omit the field.
        visibility_meters: raw.visibility.unwrap_or(10_000.0),
        wind: Wind {
            speed: raw.wind.speed,
            direction_degrees: raw.wind.deg,
        },
        location_name: raw
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        country_code: raw
            .sys
            .as_ref()
            .and_then(|s| s.country.clone())
            .unwrap_or_default(),
        provider: ProviderId::OpenWeather.display_name().to_string(),
        observation_time: unix_to_utc(raw.dt).unwrap_or_else(Utc::now),
    }
}

pub fn normalize_forecast(raw: &OwForecastResponse, coords: Coordinates) -> ForecastSeries {
    let mut entries: Vec<ForecastEntry> = raw
        .list
        .iter()
        .map(|e| ForecastEntry {
            timestamp: unix_to_utc(e.dt).unwrap_or_else(Utc::now),
            condition: condition_of(&e.weather),
            temperature: Temperature {
                current: e.main.temp,
                feels_like: e.main.feels_like,
                min: e.main.temp_min,
                max: e.main.temp_max,
            },
            humidity_percent: e.main.humidity,
            pressure_hpa: e.main.pressure,
            visibility_meters: e.visibility.unwrap_or(10_000.0),
            wind: Wind {
                speed: e.wind.speed,
                direction_degrees: e.wind.deg,
            },
        })
        .collect();
    entries.sort_by_key(|e| e.timestamp);

    let city = raw.city.as_ref();
    ForecastSeries {
        coordinates: coords,
        location_name: city
            .and_then(|c| c.name.clone())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
        country_code: city.and_then(|c| c.country.clone()).unwrap_or_default(),
        entries,
        provider: ProviderId::OpenWeather.display_name().to_string(),
    }
}

pub fn normalize_air_pollution(
    raw: &OwAirPollutionResponse,
) -> Result<AirQualityReading, ProviderError> {
    let entry = raw.list.first().ok_or_else(|| ProviderError::Normalization {
        provider: ProviderId::OpenWeather,
        reason: "air_pollution response contained no readings".to_string(),
    })?;

    let (label, color) = aqi_label(entry.main.aqi);
    Ok(AirQualityReading {
        aqi: entry.main.aqi,
        label: label.to_string(),
        color_hint: color.to_string(),
        components: PollutantConcentrations {
            co: entry.components.co,
            no: entry.components.no,
            no2: entry.components.no2,
            o3: entry.components.o3,
            so2: entry.components.so2,
            pm2_5: entry.components.pm2_5,
            pm10: entry.components.pm10,
            nh3: entry.components.nh3,
        },
        timestamp: unix_to_utc(entry.dt).unwrap_or_else(Utc::now),
    })
}

fn normalize_geocode_entry(raw: &OwGeocodeEntry) -> GeocodeMatch {
    GeocodeMatch {
        name: raw.name.clone(),
        country: raw.country.clone(),
        state: raw.state.clone(),
        lat: raw.lat,
        lon: raw.lon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_fixture() -> OwCurrentResponse {
        serde_json::from_value(serde_json::json!({
            "coord": { "lat": 48.8566, "lon": 2.3522 },
            "weather": [
                { "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }
            ],
            "main": {
                "temp": 15.0,
                "feels_like": 14.0,
                "temp_min": 13.2,
                "temp_max": 16.8,
                "pressure": 1012,
                "humidity": 80
            },
            "visibility": 8000,
            "wind": { "speed": 3.0, "deg": 200 },
            "dt": 1_700_000_000,
            "sys": { "country": "FR" },
            "name": "Paris"
        }))
        .expect("fixture must deserialize")
    }

    #[test]
    fn current_is_field_mapped_without_conversion() {
        let snapshot = normalize_current(&current_fixture());

        assert_eq!(snapshot.temperature.current, 15.0);
        assert_eq!(snapshot.temperature.feels_like, 14.0);
        assert_eq!(snapshot.humidity_percent, 80);
        assert_eq!(snapshot.wind.speed, 3.0);
        assert_eq!(snapshot.visibility_meters, 8000.0);
        assert_eq!(snapshot.location_name, "Paris");
        assert_eq!(snapshot.country_code, "FR");
        assert_eq!(snapshot.provider, "OpenWeatherMap");
        assert_eq!(snapshot.condition.code, 500);
        assert_eq!(snapshot.condition.icon, "rain");
    }

    #[test]
    fn missing_fields_get_neutral_defaults() {
        let raw: OwCurrentResponse = serde_json::from_value(serde_json::json!({
            "coord": { "lat": 0.0, "lon": 0.0 },
            "weather": [],
            "main": {
                "temp": 20.0, "feels_like": 20.0, "temp_min": 20.0, "temp_max": 20.0,
                "pressure": 1000, "humidity": 50
            },
            "wind": { "speed": 1.0 },
            "dt": 1_700_000_000
        }))
        .unwrap();

        let snapshot = normalize_current(&raw);
        assert_eq!(snapshot.location_name, UNKNOWN_LOCATION);
        assert_eq!(snapshot.country_code, "");
        assert_eq!(snapshot.visibility_meters, 10_000.0);
        assert_eq!(snapshot.wind.direction_degrees, 0.0);
        assert_eq!(snapshot.condition.icon, "na");
        assert_eq!(snapshot.condition.main, "Unknown");
    }

    #[test]
    fn forecast_entries_are_sorted_ascending() {
        let raw: OwForecastResponse = serde_json::from_value(serde_json::json!({
            "city": { "name": "Paris", "country": "FR" },
            "list": [
                {
                    "dt": 1_700_010_800,
                    "main": { "temp": 14.0, "feels_like": 13.0, "temp_min": 13.0,
                              "temp_max": 15.0, "pressure": 1011, "humidity": 82 },
                    "weather": [{ "id": 803, "description": "broken clouds" }],
                    "wind": { "speed": 4.1, "deg": 190 },
                    "visibility": 10000
                },
                {
                    "dt": 1_700_000_000,
                    "main": { "temp": 15.0, "feels_like": 14.0, "temp_min": 14.0,
                              "temp_max": 16.0, "pressure": 1012, "humidity": 80 },
                    "weather": [{ "id": 500, "description": "light rain" }],
                    "wind": { "speed": 3.0, "deg": 200 },
                    "visibility": 10000
                }
            ]
        }))
        .unwrap();

        let series = normalize_forecast(&raw, Coordinates { lat: 48.8566, lon: 2.3522 });
        assert_eq!(series.entries.len(), 2);
        assert!(series.entries[0].timestamp < series.entries[1].timestamp);
        assert_eq!(series.entries[0].condition.code, 500);
        assert_eq!(series.location_name, "Paris");
    }

    #[test]
    fn air_pollution_maps_index_and_components() {
        let raw: OwAirPollutionResponse = serde_json::from_value(serde_json::json!({
            "list": [{
                "main": { "aqi": 3 },
                "components": {
                    "co": 201.9, "no": 0.02, "no2": 0.77, "o3": 68.7,
                    "so2": 0.64, "pm2_5": 0.5, "pm10": 0.54, "nh3": 0.12
                },
                "dt": 1_700_000_000
            }]
        }))
        .unwrap();

        let reading = normalize_air_pollution(&raw).unwrap();
        assert_eq!(reading.aqi, 3);
        assert_eq!(reading.label, "Moderate");
        assert_eq!(reading.color_hint, "#ff7e00");
        assert_eq!(reading.components.pm2_5, 0.5);
    }

    #[test]
    fn air_pollution_empty_list_is_a_normalization_error() {
        let raw = OwAirPollutionResponse { list: vec![] };
        let err = normalize_air_pollution(&raw).unwrap_err();
        assert!(matches!(err, ProviderError::Normalization { .. }));
    }
}
