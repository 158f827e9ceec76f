//! End-to-end orchestrator tests over mocked upstream APIs.

use chrono::{NaiveDate, Utc};
use reqwest::Client;
use serde_json::json;
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skycast_core::provider::{
    ProviderRegistry, openmeteo::OpenMeteoProvider, openweather::OpenWeatherProvider,
    weatherapi::WeatherApiProvider,
};
use skycast_core::{ProviderError, ProviderId, Units, WeatherError, WeatherService};

fn openweather_current_body() -> serde_json::Value {
    json!({
        "coord": { "lat": 48.8566, "lon": 2.3522 },
        "weather": [{ "id": 800, "main": "Clear", "description": "clear sky", "icon": "01d" }],
        "main": {
            "temp": 15.0, "feels_like": 14.0, "temp_min": 13.0, "temp_max": 16.0,
            "pressure": 1012, "humidity": 80
        },
        "visibility": 10000,
        "wind": { "speed": 3.0, "deg": 200 },
        "dt": 1_700_000_000,
        "sys": { "country": "FR" },
        "name": "Paris"
    })
}

fn openmeteo_current_body() -> serde_json::Value {
    json!({
        "latitude": 48.86,
        "longitude": 2.35,
        "current": {
            "time": 1_700_000_000,
            "temperature_2m": 12.5,
            "apparent_temperature": 11.0,
            "relative_humidity_2m": 75.0,
            "surface_pressure": 1010.0,
            "visibility": 20_000.0,
            "wind_speed_10m": 4.2,
            "wind_direction_10m": 180.0,
            "weather_code": 3
        }
    })
}

fn weatherapi_current_body() -> serde_json::Value {
    json!({
        "location": {
            "name": "Paris", "country": "France",
            "lat": 48.87, "lon": 2.33,
            "localtime_epoch": 1_700_000_100
        },
        "current": {
            "last_updated_epoch": 1_700_000_000,
            "temp_c": 20.0, "temp_f": 68.0,
            "feelslike_c": 19.0, "feelslike_f": 66.2,
            "condition": { "text": "Sunny", "code": 1000 },
            "wind_mph": 8.1, "wind_kph": 13.0,
            "wind_degree": 250,
            "pressure_mb": 1015.0,
            "humidity": 63,
            "vis_km": 10.0
        }
    })
}

fn openweather_provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::new("ow-key".into(), Client::new()).with_base_url(server.uri())
}

fn weatherapi_provider(server: &MockServer) -> WeatherApiProvider {
    WeatherApiProvider::new("wa-key".into(), Client::new()).with_base_url(server.uri())
}

#[tokio::test]
async fn preferred_openweather_serves_current_weather() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .and(query_param("units", "metric"))
        .and(query_param("appid", "ow-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openweather_current_body()))
        .expect(1)
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&server)));
    let service = WeatherService::new(registry);

    let snapshot = service
        .get_weather_data(48.8566, 2.3522, Units::Metric, Some(ProviderId::OpenWeather))
        .await
        .expect("current weather should succeed");

    assert_eq!(snapshot.temperature.current, 15.0);
    assert_eq!(snapshot.temperature.feels_like, 14.0);
    assert_eq!(snapshot.humidity_percent, 80);
    assert_eq!(snapshot.wind.speed, 3.0);
    assert_eq!(snapshot.provider, "OpenWeatherMap");
    assert_eq!(snapshot.location_name, "Paris");
}

#[tokio::test]
async fn imperial_request_uses_weatherapi_fahrenheit_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_current_body()))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(weatherapi_provider(&server)));
    let service = WeatherService::new(registry);

    let snapshot = service
        .get_weather_data(48.8566, 2.3522, Units::Imperial, Some(ProviderId::WeatherApi))
        .await
        .expect("current weather should succeed");

    // temp_f from the payload, not a re-conversion of temp_c
    assert_eq!(snapshot.temperature.current, 68.0);
    assert_eq!(snapshot.wind.speed, 8.1);
    assert_eq!(snapshot.provider, "WeatherAPI");
}

#[tokio::test]
async fn failed_first_provider_falls_back_to_second() {
    let ow_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .expect(1)
        .mount(&ow_server)
        .await;

    let om_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openmeteo_current_body()))
        .expect(1)
        .mount(&om_server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&ow_server)));
    registry.insert(Box::new(
        OpenMeteoProvider::new(Client::new()).with_base_url(om_server.uri()),
    ));
    let service = WeatherService::new(registry);

    let snapshot = service
        .get_weather_data(48.8566, 2.3522, Units::Metric, Some(ProviderId::OpenWeather))
        .await
        .expect("fallback provider should succeed");

    assert_eq!(snapshot.provider, "Open-Meteo");
    assert_eq!(snapshot.temperature.current, 12.5);
}

#[tokio::test]
async fn exhausted_order_reports_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    // openweather fails upstream; openmeteo and weatherapi are unconfigured
    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&server)));
    let service = WeatherService::new(registry);

    let err = service
        .get_weather_data(48.8566, 2.3522, Units::Metric, None)
        .await
        .expect_err("every provider should fail");

    let failures = match err {
        WeatherError::AllProvidersFailed { failures, .. } => failures,
        other => panic!("expected AllProvidersFailed, got {other}"),
    };

    assert_eq!(failures.len(), 3);
    assert_eq!(failures[0].provider, ProviderId::OpenWeather);
    assert!(matches!(
        failures[0].error,
        ProviderError::RequestFailed { status: Some(503), .. }
    ));
    assert!(matches!(failures[1].error, ProviderError::NotConfigured { .. }));
    assert!(matches!(failures[2].error, ProviderError::NotConfigured { .. }));
}

#[tokio::test]
async fn multibyte_error_body_still_falls_back() {
    // error text with a two-byte char straddling the truncation cap
    let mut body = "x".repeat(199);
    body.push_str("échec du serveur");

    let ow_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(500).set_body_string(body))
        .expect(1)
        .mount(&ow_server)
        .await;

    let wa_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_current_body()))
        .expect(1)
        .mount(&wa_server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&ow_server)));
    registry.insert(Box::new(weatherapi_provider(&wa_server)));
    let service = WeatherService::new(registry);

    let snapshot = service
        .get_weather_data(48.8566, 2.3522, Units::Metric, Some(ProviderId::OpenWeather))
        .await
        .expect("failure must be recorded, not panic the request");

    assert_eq!(snapshot.provider, "WeatherAPI");
}

#[tokio::test]
async fn malformed_payload_falls_back_as_normalization_failure() {
    let ow_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
        .mount(&ow_server)
        .await;

    let wa_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/current.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(weatherapi_current_body()))
        .mount(&wa_server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&ow_server)));
    registry.insert(Box::new(weatherapi_provider(&wa_server)));
    let service = WeatherService::new(registry);

    let snapshot = service
        .get_weather_data(48.8566, 2.3522, Units::Metric, Some(ProviderId::OpenWeather))
        .await
        .expect("fallback should survive schema drift");

    assert_eq!(snapshot.provider, "WeatherAPI");
}

#[tokio::test]
async fn air_pollution_without_key_makes_no_http_call() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    // no OpenWeatherMap adapter registered at all
    let service = WeatherService::new(ProviderRegistry::new());

    let err = service
        .get_air_pollution_data(48.8566, 2.3522)
        .await
        .expect_err("must fail fast without a key");

    assert!(matches!(
        err,
        WeatherError::Provider(ProviderError::NotConfigured {
            provider: ProviderId::OpenWeather
        })
    ));
    // server.verify() on drop asserts the expect(0)
}

#[tokio::test]
async fn air_pollution_reads_openweather_index() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/data/2.5/air_pollution"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "list": [{
                "main": { "aqi": 2 },
                "components": {
                    "co": 201.9, "no": 0.02, "no2": 0.77, "o3": 68.7,
                    "so2": 0.64, "pm2_5": 0.5, "pm10": 0.54, "nh3": 0.12
                },
                "dt": 1_700_000_000
            }]
        })))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&server)));
    let service = WeatherService::new(registry);

    let reading = service.get_air_pollution_data(48.8566, 2.3522).await.unwrap();
    assert_eq!(reading.aqi, 2);
    assert_eq!(reading.label, "Fair");
}

#[tokio::test]
async fn astronomy_is_weatherapi_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/astronomy.json"))
        .and(query_param("dt", "2026-08-30"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "location": { "name": "Paris", "country": "France", "lat": 48.87, "lon": 2.33 },
            "astronomy": {
                "astro": {
                    "sunrise": "06:58 AM", "sunset": "08:31 PM",
                    "moonrise": "07:12 PM", "moonset": "05:40 AM",
                    "moon_phase": "Waxing Gibbous",
                    "moon_illumination": 74,
                    "is_moon_up": 0, "is_sun_up": 1
                }
            }
        })))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(weatherapi_provider(&server)));
    let service = WeatherService::new(registry);

    let date = NaiveDate::from_ymd_opt(2026, 8, 30).unwrap();
    let reading = service.get_astronomy_data(48.87, 2.33, date).await.unwrap();
    assert_eq!(reading.moon_phase, "Waxing Gibbous");
    assert!(reading.is_sun_up);

    // WeatherAPI missing entirely -> fail fast
    let empty = WeatherService::new(ProviderRegistry::new());
    let err = empty.get_astronomy_data(48.87, 2.33, date).await.unwrap_err();
    assert!(matches!(
        err,
        WeatherError::Provider(ProviderError::NotConfigured {
            provider: ProviderId::WeatherApi
        })
    ));
}

#[tokio::test]
async fn marine_prefers_openmeteo_in_default_order() {
    let om_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/marine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "latitude": 48.39,
            "longitude": -4.49,
            "hourly": {
                "time": [1_700_000_000i64, 1_700_003_600i64],
                "wave_height": [1.8, 2.0],
                "wave_direction": [280.0, 285.0],
                "wave_period": [9.5, 9.8]
            }
        })))
        .expect(1)
        .mount(&om_server)
        .await;

    let wa_server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&wa_server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(
        OpenMeteoProvider::new(Client::new()).with_marine_base_url(om_server.uri()),
    ));
    registry.insert(Box::new(weatherapi_provider(&wa_server)));
    let service = WeatherService::new(registry);

    let reading = service
        .get_marine_weather_data(48.39, -4.49, Units::Metric, None)
        .await
        .unwrap();

    assert_eq!(reading.provider, "Open-Meteo");
    assert_eq!(reading.hours.len(), 2);
    assert_eq!(reading.hours[0].wave_height_m, 1.8);
}

#[tokio::test]
async fn historical_rejects_out_of_range_dates_without_calling_upstream() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(weatherapi_provider(&server)));
    let service = WeatherService::new(registry);

    let today = Utc::now().date_naive();

    let err = service
        .get_historical_weather_data(48.87, 2.33, today + chrono::Duration::days(1), Units::Metric, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::DateOutOfRange { .. }));

    let err = service
        .get_historical_weather_data(48.87, 2.33, today - chrono::Duration::days(8), Units::Metric, None)
        .await
        .unwrap_err();
    assert!(matches!(err, WeatherError::DateOutOfRange { .. }));
}

#[tokio::test]
async fn geocode_resolves_free_text_with_country_filter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/geo/1.0/direct"))
        .and(query_param("q", "Paris,FR"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "Paris", "country": "FR", "state": "Ile-de-France",
              "lat": 48.8566, "lon": 2.3522 }
        ])))
        .mount(&server)
        .await;

    let mut registry = ProviderRegistry::new();
    registry.insert(Box::new(openweather_provider(&server)));
    let service = WeatherService::new(registry);

    let matches = service.get_city_coordinates("Paris", Some("FR")).await.unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Paris");
    assert_eq!(matches[0].state.as_deref(), Some("Ile-de-France"));
    assert_eq!(matches[0].lat, 48.8566);
}
