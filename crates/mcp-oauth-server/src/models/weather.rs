//! National Weather Service API responses (GeoJSON).

use serde::{Deserialize, Serialize};

/// `GET /alerts/active/area/{state}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertCollection {
    /// Absent when the API answered with something other than a feature collection.
    #[serde(default)]
    pub features: Option<Vec<AlertFeature>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertFeature {
    pub properties: AlertProperties,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertProperties {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub area_desc: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instruction: Option<String>,
}

impl AlertFeature {
    /// Render the alert as a plain-text block.
    #[must_use]
    pub fn format(&self) -> String {
        let props = &self.properties;
        format!(
            "Event: {}\nArea: {}\nSeverity: {}\nDescription: {}\nInstructions: {}",
            props.event.as_deref().unwrap_or("Unknown"),
            props.area_desc.as_deref().unwrap_or("Unknown"),
            props.severity.as_deref().unwrap_or("Unknown"),
            props.description.as_deref().unwrap_or("No description available"),
            props.instruction.as_deref().unwrap_or("No instructions available"),
        )
    }
}

/// `GET /points/{lat},{lon}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointResponse {
    pub properties: PointProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointProperties {
    /// Absolute URL of the gridpoint forecast.
    pub forecast: String,
}

/// Gridpoint forecast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub properties: ForecastProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastProperties {
    #[serde(default)]
    pub periods: Vec<ForecastPeriod>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPeriod {
    pub name: String,
    pub temperature: f64,
    pub temperature_unit: String,
    pub wind_speed: String,
    pub wind_direction: String,
    pub detailed_forecast: String,
}

impl ForecastPeriod {
    /// Render the period as a plain-text block.
    #[must_use]
    pub fn format(&self) -> String {
        format!(
            "Name: {}\nTemperature: {}°{}\nWind: {} {}\nDetailed Forecast: {}",
            self.name,
            self.temperature,
            self.temperature_unit,
            self.wind_speed,
            self.wind_direction,
            self.detailed_forecast,
        )
    }
}
