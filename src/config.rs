//! # Heating Controller Configuration
//!
//! This module defines the configuration for the curve controller, the initial
//! heating-curve coefficients, and the room simulation used by the harness.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [controller]
//! target_temp = 22.0
//! learning_rate = 0.1
//! f_min = 1.4
//! f_max = 5.5
//! p_min = 1100.0
//! p_max = 4300.0
//! hysteresis = 0.2
//! window_size = 5
//!
//! [curve]
//! initial_k1 = 10.0
//! initial_k2 = 30.0
//! param_file = "heating_params.json"
//! ```
//!
//! Every field is optional; missing values fall back to the defaults below.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct: controller tuning, curve defaults, and simulation.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub curve: CurveConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Immutable tuning of a [`CurveController`](crate::controller::CurveController).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ControllerConfig {
    /// Indoor setpoint in °C
    #[serde(default = "default_target_temp")]
    pub target_temp: f64,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Pump frequency at `p_min` (Hz)
    #[serde(default = "default_f_min")]
    pub f_min: f64,
    /// Pump frequency at `p_max` (Hz)
    #[serde(default = "default_f_max")]
    pub f_max: f64,
    #[serde(default = "default_p_min")]
    pub p_min: f64,
    #[serde(default = "default_p_max")]
    pub p_max: f64,
    /// Minimum change of the averaged frequency before it is accepted (Hz)
    #[serde(default = "default_hysteresis")]
    pub hysteresis: f64,
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            target_temp: default_target_temp(),
            learning_rate: default_learning_rate(),
            f_min: default_f_min(),
            f_max: default_f_max(),
            p_min: default_p_min(),
            p_max: default_p_max(),
            hysteresis: default_hysteresis(),
            window_size: default_window_size(),
        }
    }
}

impl ControllerConfig {
    /// Convenience constructor keeping every default except the setpoint.
    pub fn with_target(target_temp: f64) -> Self {
        Self {
            target_temp,
            ..Self::default()
        }
    }

    /// Validate bounds, gains and window size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            ("target_temp", self.target_temp),
            ("learning_rate", self.learning_rate),
            ("f_min", self.f_min),
            ("f_max", self.f_max),
            ("p_min", self.p_min),
            ("p_max", self.p_max),
            ("hysteresis", self.hysteresis),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ConfigError::Invalid(format!("{} must be finite, got {}", name, value)));
            }
        }
        if self.learning_rate <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.f_min >= self.f_max {
            return Err(ConfigError::Invalid(format!(
                "f_min ({}) must be below f_max ({})",
                self.f_min, self.f_max
            )));
        }
        if self.p_min >= self.p_max {
            return Err(ConfigError::Invalid(format!(
                "p_min ({}) must be below p_max ({})",
                self.p_min, self.p_max
            )));
        }
        if self.hysteresis < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "hysteresis must be >= 0, got {}",
                self.hysteresis
            )));
        }
        if self.window_size == 0 {
            return Err(ConfigError::Invalid("window_size must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Initial coefficients and where the tuned ones are kept.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CurveConfig {
    #[serde(default = "default_initial_k1")]
    pub initial_k1: f64,
    #[serde(default = "default_initial_k2")]
    pub initial_k2: f64,
    #[serde(default = "default_param_file")]
    pub param_file: String,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            initial_k1: default_initial_k1(),
            initial_k2: default_initial_k2(),
            param_file: default_param_file(),
        }
    }
}

/// Lumped room model driven by the `simulate` command.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    #[serde(default = "default_initial_indoor")]
    pub initial_indoor: f64,
    /// Mean outdoor temperature over a simulated day
    #[serde(default = "default_outdoor_mean")]
    pub outdoor_mean: f64,
    /// Peak deviation from `outdoor_mean`
    #[serde(default = "default_outdoor_swing")]
    pub outdoor_swing: f64,
    /// Cycles in one outdoor temperature period
    #[serde(default = "default_cycles_per_day")]
    pub cycles_per_day: u32,
    /// Heat capacity of the room in J/°C
    #[serde(default = "default_heat_capacity")]
    pub heat_capacity: f64,
    /// Envelope loss coefficient in W/°C
    #[serde(default = "default_loss_coefficient")]
    pub loss_coefficient: f64,
    /// Simulated seconds per control cycle
    #[serde(default = "default_step_seconds")]
    pub step_seconds: f64,
    /// Cycles reported with `heater_active = false` at start-up
    #[serde(default = "default_warmup_cycles")]
    pub warmup_cycles: u32,
    #[serde(default)]
    pub sensor_noise: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            initial_indoor: default_initial_indoor(),
            outdoor_mean: default_outdoor_mean(),
            outdoor_swing: default_outdoor_swing(),
            cycles_per_day: default_cycles_per_day(),
            heat_capacity: default_heat_capacity(),
            loss_coefficient: default_loss_coefficient(),
            step_seconds: default_step_seconds(),
            warmup_cycles: default_warmup_cycles(),
            sensor_noise: 0.0,
        }
    }
}

// Default value functions
fn default_target_temp() -> f64 { 20.0 }
fn default_learning_rate() -> f64 { 0.1 }
fn default_f_min() -> f64 { 1.4 }
fn default_f_max() -> f64 { 5.5 }
fn default_p_min() -> f64 { 1.1e3 }
fn default_p_max() -> f64 { 4.3e3 }
fn default_hysteresis() -> f64 { 0.2 }
fn default_window_size() -> usize { 5 }
fn default_initial_k1() -> f64 { 10.0 }
fn default_initial_k2() -> f64 { 30.0 }
fn default_param_file() -> String { "heating_params.json".to_string() }
fn default_initial_indoor() -> f64 { 16.0 }
fn default_outdoor_mean() -> f64 { -2.0 }
fn default_outdoor_swing() -> f64 { 4.0 }
fn default_cycles_per_day() -> u32 { 288 }
fn default_heat_capacity() -> f64 { 5.0e6 }
fn default_loss_coefficient() -> f64 { 50.0 }
fn default_step_seconds() -> f64 { 300.0 }
fn default_warmup_cycles() -> u32 { 3 }

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("Failed to parse config TOML: {}", e);
                return Err(ConfigError::Toml(e));
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    if let Err(e) = config.controller.validate() {
        tracing::error!("Rejected controller config in '{}': {}", path, e);
        return Err(e);
    }
    Ok(config)
}
