//! Canonical response shapes shared by every provider.
//!
//! Normalizers convert provider-native payloads into these types, so callers
//! never see upstream field names or native units. All values here are
//! immutable snapshots built fresh per request. Temperature and wind are in
//! the unit system the caller asked for; pressure is always hPa and
//! visibility is always meters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::ConditionKind;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Placeholder used when a provider does not report a location name.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Weather condition with the provider's own code preserved for diagnostics
/// and the neutral category/icon derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Provider-native condition code (OpenWeatherMap id, WeatherAPI code,
    /// or WMO code, depending on the source).
    pub code: i64,
    pub main: String,
    pub description: String,
    /// Provider-neutral icon identifier, "na" when the code is unmapped.
    pub icon: String,
}

impl Condition {
    pub fn new(code: i64, kind: ConditionKind, description: impl Into<String>) -> Self {
        Self {
            code,
            main: kind.main().to_string(),
            description: description.into(),
            icon: kind.icon_id().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub current: f64,
    pub feels_like: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    /// m/s for metric requests, mph for imperial requests.
    pub speed: f64,
    pub direction_degrees: f64,
}

/// Canonical current-weather result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub coordinates: Coordinates,
    pub condition: Condition,
    pub temperature: Temperature,
    pub humidity_percent: u8,
    pub pressure_hpa: f64,
    pub visibility_meters: f64,
    pub wind: Wind,
    pub location_name: String,
    pub country_code: String,
    /// Display name of the upstream source that produced this snapshot.
    pub provider: String,
    pub observation_time: DateTime<Utc>,
}

/// One forecast step: a snapshot plus the time it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub timestamp: DateTime<Utc>,
    pub condition: Condition,
    pub temperature: Temperature,
    pub humidity_percent: u8,
    pub pressure_hpa: f64,
    pub visibility_meters: f64,
    pub wind: Wind,
}

/// Chronologically ascending forecast. Interval and length vary per source:
/// OpenWeatherMap yields 3-hourly steps over 5 days, WeatherAPI and
/// Open-Meteo yield hourly steps over 3 days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSeries {
    pub coordinates: Coordinates,
    pub location_name: String,
    pub country_code: String,
    pub entries: Vec<ForecastEntry>,
    pub provider: String,
}

/// Pollutant concentrations in μg/m³.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PollutantConcentrations {
    pub co: f64,
    pub no: f64,
    pub no2: f64,
    pub o3: f64,
    pub so2: f64,
    pub pm2_5: f64,
    pub pm10: f64,
    pub nh3: f64,
}

/// Air quality on OpenWeatherMap's 1..5 index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityReading {
    pub aqi: u8,
    pub label: String,
    pub color_hint: String,
    pub components: PollutantConcentrations,
    pub timestamp: DateTime<Utc>,
}

/// Label and color hint for an AQI value; out-of-range values get an
/// explicit "Unknown" entry rather than an error.
pub fn aqi_label(aqi: u8) -> (&'static str, &'static str) {
    match aqi {
        1 => ("Good", "#00e400"),
        2 => ("Fair", "#ffff00"),
        3 => ("Moderate", "#ff7e00"),
        4 => ("Poor", "#ff0000"),
        5 => ("Very Poor", "#8f3f97"),
        _ => ("Unknown", "#808080"),
    }
}

/// One hour of marine conditions. Wave fields are what the marine
/// capability exists for; the surface-weather fields are filled only by
/// sources that report them alongside (WeatherAPI does, Open-Meteo's marine
/// endpoint does not).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarineHour {
    pub timestamp: DateTime<Utc>,
    pub wave_height_m: f64,
    pub wave_period_s: Option<f64>,
    pub wave_direction_degrees: Option<f64>,
    pub water_temperature: Option<f64>,
    pub temperature: Option<f64>,
    pub wind: Option<Wind>,
    pub wind_compass: Option<String>,
    pub gust_speed: Option<f64>,
    pub pressure_hpa: Option<f64>,
    pub humidity_percent: Option<u8>,
    pub cloud_percent: Option<u8>,
    pub visibility_meters: Option<f64>,
    pub condition: Option<Condition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarineDaySummary {
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub avg_temperature: f64,
    pub max_wind_speed: f64,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarineReading {
    pub coordinates: Coordinates,
    pub location_name: String,
    pub date: NaiveDate,
    pub hours: Vec<MarineHour>,
    pub day: Option<MarineDaySummary>,
    pub provider: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalHour {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub wind: Wind,
    pub wind_compass: String,
    pub pressure_hpa: f64,
    /// mm for metric requests, inches for imperial requests.
    pub precipitation: f64,
    pub humidity_percent: u8,
    pub cloud_percent: u8,
    pub condition: Condition,
}

/// Past-day aggregates plus hourly detail where the source provides it
/// (Open-Meteo's archive serves day aggregates only, so `hours` may be
/// empty).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalReading {
    pub coordinates: Coordinates,
    pub location_name: String,
    pub date: NaiveDate,
    pub max_temperature: f64,
    pub min_temperature: f64,
    pub avg_temperature: f64,
    pub max_wind_speed: f64,
    /// mm for metric requests, inches for imperial requests.
    pub total_precipitation: f64,
    pub avg_humidity_percent: Option<u8>,
    pub condition: Condition,
    pub hours: Vec<HistoricalHour>,
    pub provider: String,
}

/// Sun and moon rise/set data. Times are the provider's local-time strings
/// (e.g. "06:12 AM"), passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AstronomyReading {
    pub coordinates: Coordinates,
    pub location_name: String,
    pub date: NaiveDate,
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: String,
    pub moonset: String,
    pub moon_phase: String,
    pub moon_illumination_percent: u8,
    pub is_moon_up: bool,
    pub is_sun_up: bool,
    pub provider: String,
}

/// One geocoding match for a free-text location search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeMatch {
    pub name: String,
    pub country: String,
    pub state: Option<String>,
    pub lat: f64,
    pub lon: f64,
}
