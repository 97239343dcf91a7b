//! Weather tools: get_alerts, get_forecast.
//!
//! Upstream failures are reported to the caller as readable text, not errors.

use serde_json::json;

use super::{McpTool, ToolContext};
use crate::config::weather::FORECAST_PERIODS;
use crate::error::ToolResult;
use crate::models::{AlertFeature, AlertsInput, ForecastInput, ForecastPeriod};

const ALERTS_UNAVAILABLE: &str = "Unable to fetch alerts or no alerts found. Please try again later.";
const NO_ALERTS: &str = "No active alerts found for this state.";
const FORECAST_UNAVAILABLE: &str =
    "Unable to fetch forecast data for this location. Please try again later.";
const SEPARATOR: &str = "\n---\n";

/// Active weather alerts for a US state.
pub struct GetAlertsTool;

#[async_trait::async_trait]
impl McpTool for GetAlertsTool {
    fn name(&self) -> &'static str {
        "get_alerts"
    }

    fn description(&self) -> &'static str {
        "Get active weather alerts for a US state."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "state": {
                    "type": "string",
                    "description": "Two-letter US state code (e.g. CA, NY)"
                }
            },
            "required": ["state"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: AlertsInput = serde_json::from_value(input)?;
        let state = params.state_code()?;

        let features = match ctx.weather.get_alerts(&state).await {
            Ok(alerts) => alerts.features,
            Err(e) => {
                tracing::warn!(state = %state, error = %e, "Alert lookup failed");
                None
            }
        };

        let Some(features) = features else {
            return Ok(ALERTS_UNAVAILABLE.to_string());
        };
        if features.is_empty() {
            return Ok(NO_ALERTS.to_string());
        }

        Ok(features.iter().map(AlertFeature::format).collect::<Vec<_>>().join(SEPARATOR))
    }
}

/// Forecast for a latitude/longitude (first five periods).
pub struct GetForecastTool;

#[async_trait::async_trait]
impl McpTool for GetForecastTool {
    fn name(&self) -> &'static str {
        "get_forecast"
    }

    fn description(&self) -> &'static str {
        "Get the weather forecast for a latitude and longitude in the US."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "latitude": {"type": "number", "minimum": -90, "maximum": 90},
                "longitude": {"type": "number", "minimum": -180, "maximum": 180}
            },
            "required": ["latitude", "longitude"]
        })
    }

    async fn execute(&self, ctx: &ToolContext, input: serde_json::Value) -> ToolResult<String> {
        let params: ForecastInput = serde_json::from_value(input)?;
        params.validate()?;

        let point = match ctx.weather.get_point(params.latitude, params.longitude).await {
            Ok(point) => point,
            Err(e) => {
                tracing::warn!(error = %e, "Point lookup failed");
                return Ok(FORECAST_UNAVAILABLE.to_string());
            }
        };

        let forecast = match ctx.weather.get_forecast(&point.properties.forecast).await {
            Ok(forecast) => forecast,
            Err(e) => {
                tracing::warn!(error = %e, "Forecast lookup failed");
                return Ok(FORECAST_UNAVAILABLE.to_string());
            }
        };

        Ok(forecast
            .properties
            .periods
            .iter()
            .take(FORECAST_PERIODS)
            .map(ForecastPeriod::format)
            .collect::<Vec<_>>()
            .join(SEPARATOR))
    }
}
