//! Data models for tool inputs and the National Weather Service API.
//!
//! NWS models use `#[serde(rename_all = "camelCase")]` to match API naming.

mod inputs;
mod weather;

pub use inputs::*;
pub use weather::{
    AlertCollection, AlertFeature, AlertProperties, ForecastPeriod, ForecastProperties,
    ForecastResponse, PointProperties, PointResponse,
};
