//! Input models for MCP tool parameters.

use serde::{Deserialize, Serialize};

use crate::error::{ToolError, ToolResult};

/// Input for binary integer operations (add, subtract, multiply, divide).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BinaryOpInput {
    pub a: i64,
    pub b: i64,
}

/// Input for exponentiation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PowerInput {
    pub base: i64,
    pub exponent: i64,
}

/// Input for square root.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SquareRootInput {
    pub a: i64,
}

/// Input for active weather alerts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsInput {
    /// Two-letter US state code (e.g. "CA").
    pub state: String,
}

impl AlertsInput {
    /// Normalized state code.
    ///
    /// # Errors
    ///
    /// Returns a validation error unless the code is two ASCII letters.
    pub fn state_code(&self) -> ToolResult<String> {
        let code = self.state.trim();
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ToolError::validation("state", "must be a two-letter US state code"));
        }
        Ok(code.to_ascii_uppercase())
    }
}

/// Input for a point forecast.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForecastInput {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon")]
    pub longitude: f64,
}

impl ForecastInput {
    /// Check coordinate ranges.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the out-of-range coordinate.
    pub fn validate(&self) -> ToolResult<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ToolError::validation("latitude", "must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ToolError::validation("longitude", "must be between -180 and 180"));
        }
        Ok(())
    }
}
