#![no_main]

use libfuzzer_sys::fuzz_target;
use mcp_oauth_server::models::{AlertCollection, ForecastResponse, PointResponse};

fuzz_target!(|data: &[u8]| {
    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(data) {
        if let Ok(alerts) = serde_json::from_value::<AlertCollection>(json.clone()) {
            for feature in alerts.features.unwrap_or_default() {
                let _ = feature.format();
            }
        }
        let _ = serde_json::from_value::<PointResponse>(json.clone());
        if let Ok(forecast) = serde_json::from_value::<ForecastResponse>(json) {
            for period in forecast.properties.periods {
                let _ = period.format();
            }
        }
    }
});
