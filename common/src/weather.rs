// Weather provider client

use crate::config::WeatherConfig;
use crate::errors::WeatherError;
use crate::models::WeatherReport;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Current-conditions lookup by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError>;
}

/// OpenWeather current-weather API client.
pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
}

/// Wire shape of the provider's `/weather` response, reduced to the fields
/// the email template needs.
#[derive(Debug, Deserialize)]
struct CurrentConditionsResponse {
    main: MainSection,
    weather: Vec<ConditionSection>,
    wind: WindSection,
}

#[derive(Debug, Deserialize)]
struct MainSection {
    temp: f64,
    feels_like: f64,
    humidity: u32,
}

#[derive(Debug, Deserialize)]
struct ConditionSection {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct WindSection {
    speed: f64,
}

impl OpenWeatherClient {
    /// Create a new client with the configured endpoint and timeout.
    pub fn new(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| {
                WeatherError::RequestFailed(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        let url = format!("{}/weather", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", city),
                ("units", "metric"),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::ProviderRejected {
                status: status.as_u16(),
                city: city.to_string(),
                body,
            });
        }

        let payload: CurrentConditionsResponse = response
            .json()
            .await
            .map_err(|e| WeatherError::InvalidResponse(e.to_string()))?;

        let condition = payload
            .weather
            .first()
            .ok_or_else(|| WeatherError::InvalidResponse("empty weather array".to_string()))?;

        let report = WeatherReport {
            temperature: payload.main.temp,
            feels_like: payload.main.feels_like,
            description: condition.description.clone(),
            humidity: payload.main.humidity,
            wind_speed: payload.wind.speed,
            icon: condition.icon.clone(),
        };

        debug!(?report, "Weather fetched");
        Ok(report)
    }
}
