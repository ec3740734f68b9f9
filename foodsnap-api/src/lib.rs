//! foodsnap-api: the FoodSnap application boundary
//!
//! Wires the inference pipeline and the nutrition resolver into a single
//! [`FoodSnap`] context that a request layer builds once at startup and calls
//! per upload. Errors carry the HTTP status the request layer should use.

pub mod config;
pub mod context;
pub mod error;

pub use config::AppConfig;
pub use context::{Analysis, FoodSnap, HealthReport};
pub use error::{ApiError, ErrorResponse, Result};

pub use foodsnap_core::{NutritionRecord, PredictionResponse, PredictionResult};
