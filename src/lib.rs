//! Adaptive heating-curve controller.
//!
//! [`controller::CurveController`] turns an outdoor temperature into a pump
//! drive frequency along a linear heating curve, and retunes the curve from
//! the indoor error every cycle. The tuned coefficients survive restarts
//! through an injected [`persistence::CoefficientStore`].

pub mod config;
pub mod controller;
pub mod filter;
pub mod persistence;
pub mod shared;
pub mod simulation;

pub use config::{AppConfig, ConfigError, ControllerConfig};
pub use controller::{ControllerError, CurveController, CurveUpdate};
pub use persistence::{CoefficientStore, Coefficients, JsonFileStore, MemoryStore, PersistenceError};
pub use shared::{CurveSnapshot, SharedCurveController};
