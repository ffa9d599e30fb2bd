// Three-stage email pipeline: fetch -> format -> send
//
// One PipelineState per execution, owned exclusively by that execution.
// Once a stage records an error, every later stage only propagates it:
// format becomes a pass-through and send converts the error into a
// terminal result string without touching the transport.

use crate::errors::{MailError, WeatherError};
use crate::mailer::MailTransport;
use crate::models::{EmailJobData, WeatherReport};
use crate::weather::WeatherProvider;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Working state threaded through the three stages.
#[derive(Debug, Clone)]
pub struct PipelineState {
    pub city: String,
    pub recipient_email: String,
    /// Set by the fetch stage on success.
    pub weather_data: Option<WeatherReport>,
    /// Set by the format stage on success.
    pub formatted_body: Option<String>,
    /// Terminal outcome string; always set once the pipeline returns.
    pub result: Option<String>,
    /// First failure recorded by any stage; never cleared afterwards.
    pub error: Option<String>,
}

impl PipelineState {
    fn new(data: &EmailJobData) -> Self {
        Self {
            city: data.city.clone(),
            recipient_email: data.recipient_email.clone(),
            weather_data: None,
            formatted_body: None,
            result: None,
            error: None,
        }
    }

    /// Record a stage failure. The first error wins.
    fn record_error(&mut self, message: String) {
        self.error.get_or_insert(message);
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Render the fixed email template from a weather report.
fn render_email_body(report: &WeatherReport, city: &str) -> Result<String, std::fmt::Error> {
    let mut body = String::new();
    writeln!(body, "Dear User,")?;
    writeln!(body)?;
    writeln!(body, "Here's your daily weather update for {}:", city)?;
    writeln!(body)?;
    writeln!(body, "🌡️ Temperature: {}°C", report.temperature)?;
    writeln!(body, "🤔 Feels Like: {}°C", report.feels_like)?;
    writeln!(body, "☁️ Conditions: {}", report.description)?;
    writeln!(body, "💧 Humidity: {}%", report.humidity)?;
    writeln!(body, "💨 Wind Speed: {} m/s", report.wind_speed)?;
    writeln!(body)?;
    writeln!(body, "Have a great day!")?;
    writeln!(body)?;
    writeln!(body, "Best regards,")?;
    write!(body, "Your Weather Bot")?;
    Ok(body)
}

/// Executes the fetch -> format -> send sequence for one job payload.
///
/// No retry loop lives here; redelivery, if any, happens at the queue
/// layer with a fresh state.
pub struct EmailPipeline {
    provider: Arc<dyn WeatherProvider>,
    transport: Arc<dyn MailTransport>,
}

impl EmailPipeline {
    pub fn new(provider: Arc<dyn WeatherProvider>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            provider,
            transport,
        }
    }

    /// Run all three stages and return the terminal state.
    #[instrument(skip(self, data), fields(city = %data.city, recipient = %data.recipient_email))]
    pub async fn run(&self, data: &EmailJobData) -> PipelineState {
        let mut state = PipelineState::new(data);

        self.fetch_stage(&mut state).await;
        self.format_stage(&mut state);
        self.send_stage(&mut state).await;

        state
    }

    /// Stage 1: look up current conditions for the city.
    async fn fetch_stage(&self, state: &mut PipelineState) {
        match self.provider.fetch(&state.city).await {
            Ok(report) => {
                info!(city = %state.city, "Weather data fetched");
                state.weather_data = Some(report);
            }
            Err(e) => {
                warn!(city = %state.city, error = %e, "Weather fetch failed");
                state.record_error(fetch_failure(&e));
            }
        }
    }

    /// Stage 2: render the email body. Pass-through when an error is
    /// already recorded.
    fn format_stage(&self, state: &mut PipelineState) {
        if state.error.is_some() {
            return;
        }

        let Some(report) = state.weather_data.clone() else {
            state.record_error("Failed to format email: no weather data".to_string());
            return;
        };

        match render_email_body(&report, &state.city) {
            Ok(body) => state.formatted_body = Some(body),
            Err(e) => {
                warn!(error = %e, "Email formatting failed");
                state.record_error(format!("Failed to format email: {}", e));
            }
        }
    }

    /// Stage 3: deliver the email, or convert a recorded error into the
    /// terminal result without touching the transport.
    async fn send_stage(&self, state: &mut PipelineState) {
        if let Some(error) = state.error.clone() {
            state.result = Some(format!("Failed: {}", error));
            return;
        }

        let Some(body) = state.formatted_body.clone() else {
            state.record_error("Failed to send email: nothing to send".to_string());
            state.result = Some("Failed to send email".to_string());
            return;
        };

        let subject = format!("Weather Update for {}", state.city);
        match self
            .transport
            .send(&state.recipient_email, &subject, &body)
            .await
        {
            Ok(confirmation) => {
                info!(recipient = %state.recipient_email, "Email sent");
                state.result = Some(confirmation);
            }
            Err(e) => {
                warn!(recipient = %state.recipient_email, error = %e, "Email send failed");
                state.record_error(send_failure(&e));
                state.result = Some("Failed to send email".to_string());
            }
        }
    }
}

fn fetch_failure(cause: &WeatherError) -> String {
    format!("Failed to fetch weather: {}", cause)
}

fn send_failure(cause: &MailError) -> String {
    format!("Failed to send email: {}", cause)
}
