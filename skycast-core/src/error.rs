//! Error taxonomy for the provider layer and the fallback orchestrator.

use thiserror::Error;

use crate::provider::{Capability, ProviderId};

/// Failure of a single provider attempt.
///
/// `NotConfigured` and `Unsupported` are fast-skip signals: the orchestrator
/// records them and moves on without an HTTP call. `RequestFailed` and
/// `Normalization` both trigger fallback, but normalization failures point at
/// upstream schema drift rather than a transient outage and are logged
/// separately.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} is not configured (missing API key)")]
    NotConfigured { provider: ProviderId },

    #[error("{provider} does not support {capability}")]
    Unsupported {
        provider: ProviderId,
        capability: Capability,
    },

    #[error("{provider} request failed: {message}")]
    RequestFailed {
        provider: ProviderId,
        /// HTTP status, if the request got far enough to have one.
        status: Option<u16>,
        message: String,
    },

    #[error("unexpected {provider} payload: {reason}")]
    Normalization {
        provider: ProviderId,
        reason: String,
    },
}

impl ProviderError {
    /// True for the skip signals that never caused network traffic.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderError::NotConfigured { .. } | ProviderError::Unsupported { .. }
        )
    }

    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::NotConfigured { provider }
            | ProviderError::Unsupported { provider, .. }
            | ProviderError::RequestFailed { provider, .. }
            | ProviderError::Normalization { provider, .. } => *provider,
        }
    }
}

/// One recorded attempt inside an exhausted fallback sequence.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider: ProviderId,
    pub error: ProviderError,
}

/// Terminal error surfaced to the caller of the orchestrator.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("all providers failed for {capability}: [{}]", format_failures(.failures))]
    AllProvidersFailed {
        capability: Capability,
        failures: Vec<ProviderFailure>,
    },

    /// Single-provider endpoints (air quality, astronomy, geocoding) have no
    /// fallback list to exhaust, so the provider's own error propagates.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("historical data is only served for the last {max_days} days, got {date}")]
    DateOutOfRange {
        date: chrono::NaiveDate,
        max_days: u32,
    },
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.provider, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_signals_are_unavailable() {
        let err = ProviderError::NotConfigured {
            provider: ProviderId::OpenWeather,
        };
        assert!(err.is_unavailable());

        let err = ProviderError::Unsupported {
            provider: ProviderId::OpenMeteo,
            capability: Capability::Astronomy,
        };
        assert!(err.is_unavailable());

        let err = ProviderError::RequestFailed {
            provider: ProviderId::WeatherApi,
            status: Some(500),
            message: "boom".into(),
        };
        assert!(!err.is_unavailable());
    }

    #[test]
    fn aggregate_display_lists_each_attempt() {
        let err = WeatherError::AllProvidersFailed {
            capability: Capability::Current,
            failures: vec![
                ProviderFailure {
                    provider: ProviderId::OpenWeather,
                    error: ProviderError::NotConfigured {
                        provider: ProviderId::OpenWeather,
                    },
                },
                ProviderFailure {
                    provider: ProviderId::WeatherApi,
                    error: ProviderError::RequestFailed {
                        provider: ProviderId::WeatherApi,
                        status: Some(503),
                        message: "unavailable".into(),
                    },
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("openweather"));
        assert!(msg.contains("weatherapi"));
        assert!(msg.contains("unavailable"));
    }
}
